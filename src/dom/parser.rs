// HTML tokenizer and tree builder.
//
// Error-tolerant by construction: there is no input the builder aborts
// on. Malformed tags degrade to text, unmatched close tags are dropped,
// and unclosed elements are implicitly closed at end of input. The
// output tree hangs off a synthetic `document` root; no implied
// `html`/`head`/`body` structure is invented.

use log::debug;

use super::classify::{is_block, is_void};
use super::entities::decode_text;
use super::{Attribute, Dom, NodeData, NodeId};

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Token {
    StartTag {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text(String),
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0C)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

fn skip_whitespace(bytes: &[u8], pos: &mut usize) {
    while *pos < bytes.len() && is_ws(bytes[*pos]) {
        *pos += 1;
    }
}

/// Read a tag or attribute name, folded to lowercase.
fn read_name(bytes: &[u8], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < bytes.len() && is_name_byte(bytes[*pos]) {
        *pos += 1;
    }
    bytes[start..*pos]
        .iter()
        .map(|&b| b.to_ascii_lowercase() as char)
        .collect()
}

/// Collect character data, stopping at `<` or end of input. Entities
/// decode through `decode_text`; the stop byte is ASCII, so slicing
/// `input` at these offsets is always a char boundary.
fn collect_text(input: &str, pos: &mut usize) -> String {
    let bytes = input.as_bytes();
    let start = *pos;
    while *pos < bytes.len() && bytes[*pos] != b'<' {
        *pos += 1;
    }
    decode_text(&input[start..*pos])
}

/// Read an attribute value after `=`: quoted or unquoted, entities
/// decoded either way.
fn read_attr_value(input: &str, pos: &mut usize) -> String {
    let bytes = input.as_bytes();
    if *pos >= bytes.len() {
        return String::new();
    }
    match bytes[*pos] {
        quote @ (b'"' | b'\'') => {
            *pos += 1;
            let start = *pos;
            while *pos < bytes.len() && bytes[*pos] != quote {
                *pos += 1;
            }
            let value = decode_text(&input[start..*pos]);
            if *pos < bytes.len() {
                *pos += 1; // closing quote
            }
            value
        }
        _ => {
            let start = *pos;
            while *pos < bytes.len()
                && !is_ws(bytes[*pos])
                && bytes[*pos] != b'>'
                && bytes[*pos] != b'/'
            {
                *pos += 1;
            }
            decode_text(&input[start..*pos])
        }
    }
}

/// Parse the attribute list of a start tag. `pos` sits right after the
/// tag name; on return it sits past the closing `>`. Duplicate names
/// keep the last occurrence.
fn parse_attrs(input: &str, pos: &mut usize) -> (Vec<Attribute>, bool) {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute> = Vec::new();
    loop {
        skip_whitespace(bytes, pos);
        if *pos >= bytes.len() {
            return (attrs, false);
        }
        match bytes[*pos] {
            b'>' => {
                *pos += 1;
                return (attrs, false);
            }
            b'/' => {
                *pos += 1;
                skip_whitespace(bytes, pos);
                if *pos < bytes.len() && bytes[*pos] == b'>' {
                    *pos += 1;
                    return (attrs, true);
                }
                // Stray slash inside the tag; keep scanning.
            }
            _ => {
                let name = read_name(bytes, pos);
                if name.is_empty() {
                    // Unparseable byte inside the tag — skip it rather
                    // than looping forever.
                    *pos += 1;
                    continue;
                }
                skip_whitespace(bytes, pos);
                let value = if *pos < bytes.len() && bytes[*pos] == b'=' {
                    *pos += 1;
                    skip_whitespace(bytes, pos);
                    read_attr_value(input, pos)
                } else {
                    String::new()
                };
                match attrs.iter_mut().find(|a| a.name == name) {
                    Some(existing) => existing.value = value,
                    None => attrs.push(Attribute { name, value }),
                }
            }
        }
    }
}

/// Absorb raw content of `<script>`/`<style>` until the literal matching
/// close tag. The content is not interpreted: no entity decoding, no
/// nested tags. Returns the raw text; `pos` ends past the close tag.
fn collect_raw_text(input: &str, pos: &mut usize, tag: &str) -> String {
    let bytes = input.as_bytes();
    let start = *pos;
    while *pos < bytes.len() {
        let name_at = *pos + 2;
        if bytes[*pos] == b'<'
            && bytes.get(*pos + 1) == Some(&b'/')
            && bytes.len() >= name_at + tag.len()
            && bytes[name_at..name_at + tag.len()].eq_ignore_ascii_case(tag.as_bytes())
        {
            let after = name_at + tag.len();
            if matches!(bytes.get(after), None | Some(&b'>')) || is_ws(bytes[after]) {
                let content = input[start..*pos].to_string();
                // Skip past the close tag's `>`.
                *pos = after;
                while *pos < bytes.len() && bytes[*pos] != b'>' {
                    *pos += 1;
                }
                if *pos < bytes.len() {
                    *pos += 1;
                }
                return content;
            }
        }
        *pos += 1;
    }
    // Unterminated raw element swallows the rest of the input.
    input[start..].to_string()
}

fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut pos = 0usize;
    let mut tokens = Vec::new();

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            let text = collect_text(input, &mut pos);
            if !text.is_empty() {
                tokens.push(Token::Text(text));
            }
            continue;
        }
        pos += 1; // '<'
        if pos >= bytes.len() {
            tokens.push(Token::Text("<".to_string()));
            break;
        }

        match bytes[pos] {
            // Comment `<!-- … -->`, or `<!DOCTYPE …>` / other `<!…>`
            // declarations. Both are dropped.
            b'!' => {
                pos += 1;
                if bytes[pos..].starts_with(b"--") {
                    pos += 2;
                    match input[pos..].find("-->") {
                        Some(at) => pos += at + 3,
                        None => pos = bytes.len(),
                    }
                } else {
                    while pos < bytes.len() && bytes[pos] != b'>' {
                        pos += 1;
                    }
                    pos = (pos + 1).min(bytes.len());
                }
            }
            // Processing instruction `<? … >` — dropped.
            b'?' => {
                while pos < bytes.len() && bytes[pos] != b'>' {
                    pos += 1;
                }
                pos = (pos + 1).min(bytes.len());
            }
            b'/' => {
                pos += 1;
                skip_whitespace(bytes, &mut pos);
                let name = read_name(bytes, &mut pos);
                while pos < bytes.len() && bytes[pos] != b'>' {
                    pos += 1;
                }
                pos = (pos + 1).min(bytes.len());
                if !name.is_empty() {
                    tokens.push(Token::EndTag { name });
                }
            }
            _ => {
                let name = read_name(bytes, &mut pos);
                if name.is_empty() {
                    // `<` not followed by a tag name degrades to text.
                    tokens.push(Token::Text("<".to_string()));
                    continue;
                }
                let (attrs, self_closing) = parse_attrs(input, &mut pos);
                let raw = !self_closing && (name == "script" || name == "style");
                tokens.push(Token::StartTag {
                    name: name.clone(),
                    attrs,
                    self_closing,
                });
                if raw {
                    let content = collect_raw_text(input, &mut pos, &name);
                    if !content.is_empty() {
                        tokens.push(Token::Text(content));
                    }
                    tokens.push(Token::EndTag { name });
                }
            }
        }
    }

    tokens
}

// ---------------------------------------------------------------------------
// Tree builder
// ---------------------------------------------------------------------------

/// Collapse runs of ASCII whitespace to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_ascii_whitespace() {
            if !in_ws {
                out.push(' ');
                in_ws = true;
            }
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

/// Parse `html` into a DOM. With `minify`, whitespace runs in text
/// collapse to a single space and whitespace-only text between
/// block-level siblings is dropped; `<pre>` subtrees are exempt.
pub(crate) fn parse(html: &str, minify: bool) -> Dom {
    let mut dom = Dom::new();
    let mut stack: Vec<NodeId> = vec![dom.root()];

    for token in tokenize(html) {
        let top = *stack.last().expect("document root never pops");
        match token {
            Token::Text(text) => {
                let in_raw = matches!(dom.tag(top), Some("pre" | "script" | "style"))
                    || dom.has_ancestor(top, "pre");
                let content = if minify && !in_raw {
                    collapse_whitespace(&text)
                } else {
                    text
                };
                if !content.is_empty() {
                    dom.push_node(NodeData::Text(content), top);
                }
            }
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                let id = dom.push_node(NodeData::Element { name: name.clone(), attrs }, top);
                if !self_closing && !is_void(&name) {
                    stack.push(id);
                }
            }
            Token::EndTag { name } => {
                // Pop to the matching open element; a close with no match
                // on the stack is dropped entirely.
                match stack[1..]
                    .iter()
                    .rposition(|&id| dom.tag(id) == Some(name.as_str()))
                {
                    Some(at) => stack.truncate(at + 1),
                    None => debug!("dropping unmatched close tag </{name}>"),
                }
            }
        }
    }

    if minify {
        drop_interblock_whitespace(&mut dom);
    }
    dom
}

/// Remove whitespace-only text nodes that separate block-level siblings
/// (or pad the edges of a block container).
fn drop_interblock_whitespace(dom: &mut Dom) {
    let mut work = vec![dom.root()];
    while let Some(id) = work.pop() {
        if dom.tag(id) == Some("pre") {
            continue;
        }
        let parent_is_block = match dom.tag(id) {
            Some("document") => true,
            Some(tag) => is_block(tag),
            None => false,
        };
        let children = dom.nodes[id].children.clone();
        let keep: Vec<NodeId> = children
            .iter()
            .enumerate()
            .filter(|&(i, &child)| {
                let ws_only = matches!(
                    &dom.nodes[child].data,
                    NodeData::Text(t) if t.bytes().all(|b| b.is_ascii_whitespace())
                );
                if !ws_only {
                    return true;
                }
                let block_edge = |n: Option<&NodeId>| match n {
                    Some(&sib) => dom.tag(sib).is_some_and(is_block),
                    None => parent_is_block,
                };
                let prev_block = block_edge(i.checked_sub(1).and_then(|p| children.get(p)));
                let next_block = block_edge(children.get(i + 1));
                !(prev_block || next_block)
            })
            .map(|(_, &child)| child)
            .collect();
        dom.nodes[id].children = keep;
        work.extend(dom.nodes[id].children.iter().copied());
    }
}
