// Conversion engine: DOM tree → LaTeX document.
//
// The driver is an iterative two-phase depth-first walk. Every element
// is visited twice — once to emit its opening markup (after the style
// applier has wrapped it) and once to emit its closing markup — with
// the computed CSS for the subtree threaded through the explicit stack.
// Recursion is deliberately avoided so pathologically nested input
// cannot overflow the call stack.

pub(crate) mod element;
pub(crate) mod style;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::buffer::LatexBuffer;
use crate::css::parse::{merge, parse_style};
use crate::css::{Properties, PropertyMask};
use crate::dom::classify::{should_exclude, should_skip_nested_table};
use crate::dom::{parser, Dom, NodeData, NodeId, MAX_INPUT_SIZE};
use crate::download::Downloader;
use crate::error::Error;
use crate::Options;

/// Fixed document preamble. `ulem` provides `\sout`, `xcolor[table]`
/// provides `\cellcolor`, `placeins` keeps floats near their source.
const PREAMBLE: &str = "\\documentclass{article}\n\
\\usepackage{hyperref}\n\
\\usepackage{ulem}\n\
\\usepackage[table]{xcolor}\n\
\\usepackage{tabularx}\n\
\\usepackage{graphicx}\n\
\\usepackage{placeins}\n\
\\setcounter{secnumdepth}{4}\n";

/// Mutable per-conversion state: counters for generated labels, the
/// table/list machines, and the style applier's debts.
#[derive(Debug, Default)]
pub(crate) struct ConverterState {
    // Label counters.
    pub table_idx: u32,
    pub figure_idx: u32,
    pub image_idx: u32,

    // Nesting state.
    pub list_depth: u32,
    pub in_paragraph: bool,
    pub in_table: bool,
    pub in_table_row: bool,
    pub in_table_cell: bool,
    pub table_columns: usize,
    pub current_column: usize,

    /// Caption captured from the first `<caption>` of the open table.
    pub table_caption: Option<String>,

    // Style applier debts.
    pub open_braces: u8,
    pub open_environments: u8,
    pub applied_props: PropertyMask,
}

impl ConverterState {
    /// Record one owed closing brace.
    pub(crate) fn owe_brace(&mut self) {
        self.open_braces = self.open_braces.saturating_add(1);
    }
}

enum Phase {
    Open,
    Close,
}

struct Frame {
    node: NodeId,
    css: Rc<Properties>,
    phase: Phase,
}

/// Reusable HTML → LaTeX converter.
///
/// Each `convert` call produces an independent document; the image
/// counter is the only state carried across calls, so files downloaded
/// by successive conversions into the same directory never collide.
///
/// # Examples
///
/// ```
/// let mut converter = html2tex::LatexConverter::new(html2tex::Options::new());
/// let tex = converter.convert("<p>Hello</p>").unwrap();
/// assert!(tex.contains("\\documentclass{article}"));
/// ```
pub struct LatexConverter {
    options: Options,
    buf: LatexBuffer,
    pub(crate) state: ConverterState,
    pub(crate) downloader: Option<Downloader>,
    /// Monotonic across conversions; names downloaded files.
    pub(crate) image_count: u64,
}

impl LatexConverter {
    pub fn new(options: Options) -> Self {
        let downloader = if options.download_images && options.image_dir.is_some() {
            Some(Downloader::new(Downloader::DEFAULT_WORKERS))
        } else {
            None
        };
        Self {
            options,
            buf: LatexBuffer::new(),
            state: ConverterState::default(),
            downloader,
            image_count: 0,
        }
    }

    /// Enable image downloads into `dir`, creating it if needed.
    pub fn set_image_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<(), Error> {
        std::fs::create_dir_all(&dir)?;
        self.options.image_dir = Some(dir.as_ref().to_path_buf());
        self.options.download_images = true;
        if self.downloader.is_none() {
            self.downloader = Some(Downloader::new(Downloader::DEFAULT_WORKERS));
        }
        Ok(())
    }

    pub(crate) fn image_dir(&self) -> Option<&PathBuf> {
        self.options.image_dir.as_ref()
    }

    pub(crate) fn downloads_enabled(&self) -> bool {
        self.options.download_images && self.options.image_dir.is_some()
    }

    /// Convert an HTML string to a complete LaTeX document.
    pub fn convert(&mut self, html: &str) -> Result<String, Error> {
        if html.len() > MAX_INPUT_SIZE {
            return Err(Error::InputTooLarge(html.len()));
        }
        let dom = parser::parse(html, self.options.minify);
        self.convert_dom(&dom)
    }

    /// Convert an already-parsed DOM to a complete LaTeX document.
    pub fn convert_dom(&mut self, dom: &Dom) -> Result<String, Error> {
        self.buf.clear();
        self.state = ConverterState::default();

        self.buf.push_str(PREAMBLE);
        let title = dom.title();
        if let Some(title) = &title {
            self.buf.push_str("\\title{");
            self.buf.push_escaped(title.trim());
            self.buf.push_str("}\n");
        }
        self.buf.push_str("\\begin{document}\n");
        if title.is_some() {
            self.buf.push_str("\\maketitle\n\n");
        }

        self.drive(dom);

        self.buf.push_str("\n\\end{document}\n");
        self.buf.into_string()
    }

    /// Convert and write the result to a file.
    pub fn convert_to_file<P: AsRef<Path>>(&mut self, html: &str, path: P) -> Result<(), Error> {
        let tex = self.convert(html)?;
        std::fs::write(path, tex)?;
        Ok(())
    }

    /// The iterative DFS at the heart of the conversion.
    fn drive(&mut self, dom: &Dom) {
        let mut stack = vec![Frame {
            node: dom.root(),
            css: Rc::new(Properties::new()),
            phase: Phase::Open,
        }];

        while let Some(frame) = stack.pop() {
            match frame.phase {
                Phase::Open => self.open_node(dom, frame, &mut stack),
                Phase::Close => {
                    element::close(self, dom, frame.node);
                    let tag = dom.tag(frame.node).unwrap_or("");
                    style::end(&mut self.state, &mut self.buf, &frame.css, tag);
                }
            }
        }
    }

    fn open_node(&mut self, dom: &Dom, frame: Frame, stack: &mut Vec<Frame>) {
        let id = frame.node;
        match &dom.node(id).data {
            NodeData::Text(text) => {
                // Verbatim environments take the text untouched.
                if dom
                    .node(id)
                    .parent
                    .is_some_and(|p| dom.tag(p) == Some("pre") || dom.has_ancestor(p, "pre"))
                {
                    self.buf.push_str(text);
                } else {
                    self.buf.push_escaped(text);
                    // Style wrappers bind to the first text run of the
                    // styled element; settle them here.
                    style::close_wrappers(&mut self.state, &mut self.buf);
                }
            }
            NodeData::Element { name, .. } => {
                if should_exclude(name) || should_skip_nested_table(dom, id) {
                    return;
                }

                let effective = match dom.attr(id, "style") {
                    Some(style_attr) => {
                        let inline = parse_style(style_attr);
                        Rc::new(merge(&frame.css, &inline))
                    }
                    None => Rc::clone(&frame.css),
                };

                // A cell is "inside a table cell" for its own styles
                // too: mark it before the applier runs so cell-scoped
                // emissions (`\cellcolor`) resolve correctly.
                if self.state.in_table && matches!(name.as_str(), "td" | "th") {
                    self.state.in_table_cell = true;
                }

                let emission = if element::is_supported(name) {
                    style::apply(&mut self.state, &mut self.buf, &effective, name);
                    element::open(self, dom, id, &effective)
                } else {
                    element::Emission::Unsupported
                };

                if matches!(emission, element::Emission::Void) {
                    // No children, no close phase; settle the wrappers
                    // the applier opened around this element.
                    style::end(&mut self.state, &mut self.buf, &effective, name);
                    return;
                }

                if !matches!(emission, element::Emission::Unsupported) {
                    stack.push(Frame {
                        node: id,
                        css: Rc::clone(&effective),
                        phase: Phase::Close,
                    });
                }
                for &child in dom.node(id).children.iter().rev() {
                    stack.push(Frame {
                        node: child,
                        css: Rc::clone(&effective),
                        phase: Phase::Open,
                    });
                }
            }
        }
    }
}

impl Drop for LatexConverter {
    fn drop(&mut self) {
        if let Some(downloader) = self.downloader.take() {
            downloader.cancel();
        }
    }
}
