// Append-only output buffer with LaTeX escaping.
//
// All LaTeX emission funnels through `LatexBuffer`. The buffer enforces a
// hard capacity ceiling: an append that would cross it poisons the buffer,
// every later append becomes a no-op, and `into_string` reports the
// overflow. This keeps the emission call sites free of error plumbing
// while still failing the conversion atomically.

use std::borrow::Cow;
use std::fmt;

use crate::error::Error;

/// Hard ceiling on the output size (256 MiB).
pub(crate) const MAX_CAPACITY: usize = 256 * 1024 * 1024;

const INITIAL_CAPACITY: usize = 64;
const MIN_GROW: usize = 32;

/// Growable byte buffer that owns the LaTeX output of one conversion.
#[derive(Debug)]
pub struct LatexBuffer {
    data: String,
    poisoned: bool,
}

impl LatexBuffer {
    pub fn new() -> Self {
        Self {
            data: String::with_capacity(INITIAL_CAPACITY),
            poisoned: false,
        }
    }

    /// Make room for `additional` bytes: double the capacity (stepping at
    /// least `MIN_GROW`) until it fits, or poison the buffer when the
    /// request crosses `MAX_CAPACITY`.
    fn grow(&mut self, additional: usize) -> bool {
        if self.poisoned {
            return false;
        }
        let needed = match self.data.len().checked_add(additional) {
            Some(n) if n <= MAX_CAPACITY => n,
            _ => {
                self.poisoned = true;
                return false;
            }
        };
        if needed > self.data.capacity() {
            let mut target = self.data.capacity().max(INITIAL_CAPACITY);
            while target < needed {
                target = (target * 2).max(target + MIN_GROW).min(MAX_CAPACITY);
            }
            self.data.reserve_exact(target - self.data.len());
        }
        true
    }

    pub fn push_str(&mut self, s: &str) {
        if self.grow(s.len()) {
            self.data.push_str(s);
        }
    }

    pub fn push_char(&mut self, c: char) {
        if self.grow(c.len_utf8()) {
            self.data.push(c);
        }
    }

    /// Append `text` with every LaTeX special escaped.
    pub fn push_escaped(&mut self, text: &str) {
        match escape_latex(text) {
            Cow::Borrowed(s) => self.push_str(s),
            Cow::Owned(s) => self.push_str(&s),
        }
    }

    /// Append a `\href` URL argument: same escapes minus the braces,
    /// which delimit the argument and must stay literal.
    pub fn push_href_escaped(&mut self, url: &str) {
        match escape_href(url) {
            Cow::Borrowed(s) => self.push_str(s),
            Cow::Owned(s) => self.push_str(&s),
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.poisoned = false;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Detach the accumulated output, leaving the buffer empty and clean.
    pub fn into_string(&mut self) -> Result<String, Error> {
        if self.poisoned {
            self.clear();
            return Err(Error::BufferOverflow);
        }
        Ok(std::mem::take(&mut self.data))
    }
}

impl Default for LatexBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for LatexBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // Overflow is tracked by the poison flag, not the fmt error
        // channel; `into_string` is the single failure point.
        self.push_str(s);
        Ok(())
    }
}

/// The replacement for one special byte, or `None` to copy it through.
fn escape_of(b: u8, escape_braces: bool) -> Option<&'static str> {
    Some(match b {
        b'\\' => "\\textbackslash{}",
        b'{' if escape_braces => "\\{",
        b'}' if escape_braces => "\\}",
        b'&' => "\\&",
        b'%' => "\\%",
        b'$' => "\\$",
        b'#' => "\\#",
        b'_' => "\\_",
        b'^' => "\\^{}",
        b'~' => "\\~{}",
        b'<' => "\\textless{}",
        b'>' => "\\textgreater{}",
        b'\n' => "\\\\",
        _ => return None,
    })
}

fn escape_impl(text: &str, escape_braces: bool) -> Cow<'_, str> {
    // Fast path: nothing to escape — return a borrowed slice.
    if !text
        .bytes()
        .any(|b| escape_of(b, escape_braces).is_some())
    {
        return Cow::Borrowed(text);
    }

    // SAFETY of the byte indexing: every escaped character is single-byte
    // ASCII, so byte offsets at match positions are valid UTF-8 boundaries
    // and `&text[last..i]` slices are always well formed.
    let mut result = String::with_capacity(text.len() + 16);
    let mut last = 0;
    let bytes = text.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(replacement) = escape_of(b, escape_braces) {
            result.push_str(&text[last..i]);
            result.push_str(replacement);
            last = i + 1;
        }
    }

    result.push_str(&text[last..]);
    Cow::Owned(result)
}

/// Escape every LaTeX special character in `text`.
///
/// The table is fixed: `\` `{` `}` `&` `%` `$` `#` `_` `^` `~` `<` `>`
/// are replaced by their LaTeX spellings and a newline becomes a forced
/// line break (`\\`).
pub fn escape_latex(text: &str) -> Cow<'_, str> {
    escape_impl(text, true)
}

/// Escape a URL for use inside `\href{…}`: the full table minus braces.
pub fn escape_href(url: &str) -> Cow<'_, str> {
    escape_impl(url, false)
}
