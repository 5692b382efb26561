// Concurrent image downloader.
//
// A fixed pool of worker threads consumes a bounded queue of download
// jobs and records results correlated by sequence number. The
// converter always requests one file synchronously (`fetch`), so no
// downloader lock is ever held while LaTeX is being emitted; the queue
// interface exists so a binding layer can batch jobs if it wants to.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;
use url::Url;

/// One queued download.
#[derive(Debug, Clone)]
pub struct Job {
    pub url: String,
    pub dir: PathBuf,
    pub seq: u64,
}

/// Outcome of one job, correlated by sequence number.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub seq: u64,
    pub outcome: Result<PathBuf, String>,
}

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    results: Vec<JobResult>,
    /// Jobs taken by a worker but not yet finished.
    active: usize,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    /// Signals workers (new job or shutdown) and enqueuers (space freed).
    work: Condvar,
    /// Signals waiters when a result lands.
    done: Condvar,
}

/// Fixed-size worker pool over a bounded blocking queue.
pub struct Downloader {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Downloader {
    pub const DEFAULT_WORKERS: usize = 4;
    const QUEUE_CAPACITY: usize = 64;
    const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(workers: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            work: Condvar::new(),
            done: Condvar::new(),
        });
        let workers = (0..workers.max(1))
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("img-download-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("spawn downloader worker")
            })
            .collect();
        Self { shared, workers }
    }

    /// Queue a download. Blocks while the queue is full; returns
    /// `false` once the pool is shutting down.
    pub fn enqueue(&self, url: &str, dir: &Path, seq: u64) -> bool {
        let mut queue = self.shared.queue.lock().expect("downloader lock");
        while queue.jobs.len() >= Self::QUEUE_CAPACITY && !queue.shutdown {
            queue = self.shared.work.wait(queue).expect("downloader lock");
        }
        if queue.shutdown {
            return false;
        }
        queue.jobs.push_back(Job {
            url: url.to_string(),
            dir: dir.to_path_buf(),
            seq,
        });
        self.shared.work.notify_one();
        true
    }

    /// Wait until every queued job has finished. Returns `false` on
    /// timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = self.shared.queue.lock().expect("downloader lock");
        while !queue.jobs.is_empty() || queue.active > 0 {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            let (guard, result) = self
                .shared
                .done
                .wait_timeout(queue, remaining)
                .expect("downloader lock");
            queue = guard;
            if result.timed_out() && (!queue.jobs.is_empty() || queue.active > 0) {
                return false;
            }
        }
        true
    }

    /// Drop all pending jobs. Returns how many were drained. Running
    /// jobs finish; nothing new starts until jobs are enqueued again.
    pub fn cancel(&self) -> usize {
        let mut queue = self.shared.queue.lock().expect("downloader lock");
        let drained = queue.jobs.len();
        queue.jobs.clear();
        self.shared.done.notify_all();
        drained
    }

    /// Take the result for `seq`, if it has arrived.
    pub fn take_result(&self, seq: u64) -> Option<Result<PathBuf, String>> {
        let mut queue = self.shared.queue.lock().expect("downloader lock");
        let at = queue.results.iter().position(|r| r.seq == seq)?;
        Some(queue.results.swap_remove(at).outcome)
    }

    /// Synchronous single-file convenience: enqueue, wait, collect.
    pub fn fetch(&self, url: &str, dir: &Path, seq: u64) -> Result<PathBuf, String> {
        if !self.enqueue(url, dir, seq) {
            return Err("downloader is shut down".to_string());
        }
        let deadline = Instant::now() + Self::HTTP_TIMEOUT + Duration::from_secs(5);
        loop {
            if let Some(outcome) = self.take_result(seq) {
                return outcome;
            }
            if Instant::now() >= deadline {
                return Err("timed out waiting for download".to_string());
            }
            self.wait(Duration::from_millis(50));
        }
    }
}

impl Drop for Downloader {
    /// Drains pending jobs and joins the workers within bounded time.
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock().expect("downloader lock");
            queue.jobs.clear();
            queue.shutdown = true;
        }
        self.shared.work.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &Shared) {
    let client = reqwest::blocking::Client::builder()
        .timeout(Downloader::HTTP_TIMEOUT)
        .build();

    loop {
        let job = {
            let mut queue = shared.queue.lock().expect("downloader lock");
            loop {
                if queue.shutdown {
                    return;
                }
                if let Some(job) = queue.jobs.pop_front() {
                    queue.active += 1;
                    // Space freed: unblock a full-queue enqueuer.
                    shared.work.notify_all();
                    break job;
                }
                queue = shared.work.wait(queue).expect("downloader lock");
            }
        };

        let outcome = match &client {
            Ok(client) => download(client, &job),
            Err(err) => Err(format!("HTTP client init failed: {err}")),
        };

        let mut queue = shared.queue.lock().expect("downloader lock");
        queue.active -= 1;
        queue.results.push(JobResult {
            seq: job.seq,
            outcome,
        });
        shared.done.notify_all();
    }
}

/// Fetch one URL into `dir` as `imgSEQ.EXT`, with the extension taken
/// from the URL path (falling back to `png`).
fn download(client: &reqwest::blocking::Client, job: &Job) -> Result<PathBuf, String> {
    let url = Url::parse(&job.url).map_err(|e| format!("invalid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported URL scheme {:?}", url.scheme()));
    }

    let extension = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 4 && e.bytes().all(|b| b.is_ascii_alphanumeric()))
        .unwrap_or("png")
        .to_ascii_lowercase();
    let path = job.dir.join(format!("img{}.{extension}", job.seq));

    debug!("downloading {url} -> {}", path.display());
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| format!("request failed: {e}"))?;
    let bytes = response.bytes().map_err(|e| format!("read failed: {e}"))?;

    let mut file = File::create(&path).map_err(|e| format!("create failed: {e}"))?;
    file.write_all(&bytes)
        .map_err(|e| format!("write failed: {e}"))?;
    Ok(path)
}
