// html2tex — HTML to LaTeX converter.
//
// Architecture:
//   HTML string → forgiving tokenizer/tree-builder → DOM arena
//     → iterative conversion driver (inline-CSS cascade + style applier
//       + per-element translators) → LaTeX document string
//
// The parser is deliberately HTML5-lean rather than spec-complete: it
// never fails on malformed markup, drops unmatched close tags, and
// builds the tree exactly as written (no implied html/head/body).

mod buffer;
mod download;
mod error;
pub mod css;
pub mod dom;
mod latex;

use std::path::PathBuf;

pub use buffer::{escape_href, escape_latex, LatexBuffer};
pub use download::Downloader;
pub use dom::HtmlParser;
pub use error::Error;
pub use latex::LatexConverter;

/// Conversion options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Collapse whitespace while parsing.
    pub minify: bool,
    /// Fetch referenced images into `image_dir`. Without a directory
    /// this has no effect.
    pub download_images: bool,
    /// Where downloaded images land; also enables downloads.
    pub image_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            minify: false,
            download_images: true,
            image_dir: None,
        }
    }
}

impl Options {
    /// Create a new Options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether whitespace is collapsed during parsing.
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Set the image output directory (enables downloads).
    pub fn with_image_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// Set whether referenced images are downloaded.
    pub fn with_downloads(mut self, download: bool) -> Self {
        self.download_images = download;
        self
    }
}

/// Convert an HTML string to a LaTeX document using default options.
///
/// # Examples
///
/// ```
/// let tex = html2tex::convert("<h1>Hello</h1><p>World</p>").unwrap();
/// assert!(tex.contains("\\section{Hello}"));
/// ```
pub fn convert(html: &str) -> Result<String, Error> {
    convert_with(html, &Options::default())
}

/// Convert an HTML string to a LaTeX document with custom options.
///
/// # Examples
///
/// ```
/// use html2tex::{convert_with, Options};
///
/// let options = Options::new().with_minify(true);
/// let tex = convert_with("<p>Hello   world</p>", &options).unwrap();
/// assert!(tex.contains("Hello world"));
/// ```
pub fn convert_with(html: &str, options: &Options) -> Result<String, Error> {
    LatexConverter::new(options.clone()).convert(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_empty() {
        let result = convert("").unwrap();
        assert!(result.starts_with("\\documentclass{article}\n"));
        assert!(result.ends_with("\\end{document}\n"));
    }

    #[test]
    fn test_convert_simple_paragraph() {
        let result = convert("<p>Hello, world!</p>").unwrap();
        assert!(result.contains("Hello, world!"));
    }

    #[test]
    fn test_convert_heading() {
        let result = convert("<h1>Title</h1>").unwrap();
        assert!(result.contains("\\section{Title}"));
    }

    #[test]
    fn test_options_builder() {
        let options = Options::new()
            .with_minify(true)
            .with_downloads(false)
            .with_image_dir("/tmp/imgs");

        assert!(options.minify);
        assert!(!options.download_images);
        assert_eq!(
            options.image_dir.as_deref(),
            Some(std::path::Path::new("/tmp/imgs"))
        );
    }

    #[test]
    fn test_default_options() {
        let options = Options::default();
        assert!(!options.minify);
        assert!(options.download_images);
        assert!(options.image_dir.is_none());
    }
}
