/// Errors that can occur during HTML-to-LaTeX conversion.
///
/// Non-fatal conditions (an invalid CSS value, a failed image download)
/// are logged through the `log` facade and never surface here; the
/// offending fragment is skipped and emission continues.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The output buffer exceeded its maximum capacity.
    #[error("LaTeX output exceeded the maximum buffer capacity")]
    BufferOverflow,

    /// Input was larger than the 128 MiB ceiling.
    #[error("input of {0} bytes exceeds the 128 MiB limit")]
    InputTooLarge(usize),

    /// The DOM builder could not produce a tree at all.
    ///
    /// Malformed markup is tolerated and never produces this; it is
    /// reserved for inputs that defeat tokenization entirely.
    #[error("HTML parse error: {0}")]
    Parse(String),

    /// A table-state invariant was broken (e.g. a cell outside a row).
    /// The table is closed defensively before this is reported.
    #[error("table state error: {0}")]
    Table(String),

    /// Image download or local write failed for every fallback.
    #[error("image error: {0}")]
    ImageIo(String),

    /// External file read/write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
