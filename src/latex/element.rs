// Element translator — per-tag opening and closing LaTeX emission.
//
// One dispatch per phase. Handlers only append markup and mutate the
// converter state; computed styles are already applied by the time
// `open` runs. Tables are the one place with a real state machine:
// rows and cells coordinate through `ConverterState`.

use log::{debug, warn};
use std::fmt::Write;

use crate::css::parse::parse_style;
use crate::css::value::length_to_pt;
use crate::css::Properties;
use crate::dom::classify::{count_table_columns, table_contains_only_images};
use crate::dom::{Dom, NodeId};

use super::LatexConverter;

/// What an element contributed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Emission {
    /// Not in the tag table; children still recurse, styles do not apply.
    Unsupported,
    /// Recognized but transparent (e.g. `div`): children recurse.
    NoOutput,
    /// Markup was emitted; a close phase will follow.
    Emitted,
    /// Fully handled at open: no children, no close phase.
    Void,
}

/// Tags with an entry in the translation table. Unsupported tags skip
/// the style applier entirely.
pub(crate) fn is_supported(tag: &str) -> bool {
    matches!(
        tag,
        "h1" | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "p"
            | "br"
            | "hr"
            | "b"
            | "strong"
            | "i"
            | "em"
            | "u"
            | "s"
            | "strike"
            | "del"
            | "code"
            | "tt"
            | "sub"
            | "sup"
            | "a"
            | "ul"
            | "ol"
            | "li"
            | "blockquote"
            | "pre"
            | "img"
            | "table"
            | "caption"
            | "tr"
            | "td"
            | "th"
            | "thead"
            | "tbody"
            | "tfoot"
            | "div"
            | "span"
            | "font"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "nav"
            | "aside"
    )
}

pub(crate) fn open(
    conv: &mut LatexConverter,
    dom: &Dom,
    id: NodeId,
    props: &Properties,
) -> Emission {
    let Some(tag) = dom.tag(id) else {
        return Emission::Unsupported;
    };
    match tag {
        "h1" => {
            conv.state.in_paragraph = false;
            conv.buf.push_str("\\section{");
            Emission::Emitted
        }
        "h2" => {
            conv.buf.push_str("\\subsection{");
            Emission::Emitted
        }
        "h3" => {
            conv.buf.push_str("\\subsubsection{");
            Emission::Emitted
        }
        "h4" => {
            conv.buf.push_str("\\paragraph{");
            Emission::Emitted
        }
        "h5" | "h6" => {
            conv.buf.push_str("\\textbf{");
            Emission::Emitted
        }
        "p" => {
            conv.state.in_paragraph = true;
            Emission::Emitted
        }
        "br" => {
            conv.buf.push_str("\\\\\n");
            Emission::Void
        }
        "hr" => {
            conv.buf.push_str("\\hrule\n");
            Emission::Void
        }
        "b" | "strong" => {
            conv.buf.push_str("\\textbf{");
            Emission::Emitted
        }
        "i" | "em" => {
            conv.buf.push_str("\\textit{");
            Emission::Emitted
        }
        "u" => {
            conv.buf.push_str("\\underline{");
            Emission::Emitted
        }
        "s" | "strike" | "del" => {
            conv.buf.push_str("\\sout{");
            Emission::Emitted
        }
        "code" | "tt" => {
            conv.buf.push_str("\\texttt{");
            Emission::Emitted
        }
        "sub" => {
            conv.buf.push_str("\\textsubscript{");
            Emission::Emitted
        }
        "sup" => {
            conv.buf.push_str("\\textsuperscript{");
            Emission::Emitted
        }
        "a" => match dom.attr(id, "href") {
            Some(href) => {
                conv.buf.push_str("\\href{");
                conv.buf.push_href_escaped(href);
                conv.buf.push_str("}{");
                Emission::Emitted
            }
            None => Emission::NoOutput,
        },
        "ul" => {
            conv.state.list_depth += 1;
            conv.buf.push_str("\\begin{itemize}\n");
            Emission::Emitted
        }
        "ol" => {
            conv.state.list_depth += 1;
            conv.buf.push_str("\\begin{enumerate}\n");
            Emission::Emitted
        }
        "li" => {
            if conv.state.list_depth == 0 {
                debug!("list item outside a list");
            }
            conv.buf.push_str("\\item ");
            Emission::Emitted
        }
        "blockquote" => {
            conv.buf.push_str("\\begin{quote}\n");
            Emission::Emitted
        }
        "pre" => {
            conv.buf.push_str("\\begin{verbatim}\n");
            Emission::Emitted
        }
        "img" => {
            emit_image(conv, dom, id, props);
            Emission::Void
        }
        "table" => open_table(conv, dom, id),
        "caption" => {
            if conv.state.in_table && conv.state.table_caption.is_none() {
                conv.state.table_caption = Some(dom.text_content(id).trim().to_string());
            }
            Emission::Void
        }
        "tr" => {
            if conv.state.in_table {
                conv.state.in_table_row = true;
                conv.state.current_column = 0;
            }
            Emission::Emitted
        }
        "td" | "th" => open_cell(conv, tag == "th"),
        "thead" | "tbody" | "tfoot" => Emission::NoOutput,
        "div" | "span" | "font" | "section" | "article" | "header" | "footer" | "nav"
        | "aside" => Emission::NoOutput,
        _ => Emission::Unsupported,
    }
}

pub(crate) fn close(conv: &mut LatexConverter, dom: &Dom, id: NodeId) {
    let Some(tag) = dom.tag(id) else { return };
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => conv.buf.push_str("}\n\n"),
        "p" => {
            // A heading inside the paragraph (malformed nesting) has
            // already ended it; avoid a stray paragraph break then.
            if conv.state.in_paragraph {
                conv.buf.push_str("\n\n");
            }
            conv.state.in_paragraph = false;
        }
        "b" | "strong" | "i" | "em" | "u" | "s" | "strike" | "del" | "code" | "tt" | "sub"
        | "sup" => conv.buf.push_char('}'),
        "a" => {
            if dom.attr(id, "href").is_some() {
                conv.buf.push_char('}');
            }
        }
        "ul" => {
            conv.state.list_depth = conv.state.list_depth.saturating_sub(1);
            conv.buf.push_str("\\end{itemize}\n");
        }
        "ol" => {
            conv.state.list_depth = conv.state.list_depth.saturating_sub(1);
            conv.buf.push_str("\\end{enumerate}\n");
        }
        "li" => conv.buf.push_char('\n'),
        "blockquote" => conv.buf.push_str("\\end{quote}\n"),
        "pre" => conv.buf.push_str("\\end{verbatim}\n"),
        "table" => close_table(conv, dom, id),
        "tr" => {
            if conv.state.in_table {
                conv.buf.push_str(" \\\\ \\hline\n");
                conv.state.in_table_row = false;
            }
        }
        "td" => conv.state.in_table_cell = false,
        "th" => {
            // Mirrors the open condition: header cells only emit
            // `\textbf{` when a table is open.
            if conv.state.in_table {
                conv.buf.push_char('}');
            }
            conv.state.in_table_cell = false;
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn open_table(conv: &mut LatexConverter, dom: &Dom, id: NodeId) -> Emission {
    if table_contains_only_images(dom, id) {
        emit_image_table_as_figure(conv, dom, id);
        return Emission::Void;
    }

    let columns = count_table_columns(dom, id);
    conv.buf.push_str("\\begin{table}[h]\n\\centering\n\\begin{tabular}{");
    for _ in 0..columns {
        conv.buf.push_str("|c");
    }
    conv.buf.push_str("|}\n\\hline\n");

    conv.state.in_table = true;
    conv.state.in_table_row = false;
    conv.state.in_table_cell = false;
    conv.state.table_columns = columns;
    conv.state.current_column = 0;
    conv.state.table_caption = None;
    Emission::Emitted
}

fn close_table(conv: &mut LatexConverter, dom: &Dom, id: NodeId) {
    if !conv.state.in_table {
        return;
    }
    // A row left open means a missing `</tr>` survived into the tree;
    // close it defensively so the tabular stays well formed.
    if conv.state.in_table_row {
        warn!("closing table with an open row");
        conv.buf.push_str(" \\\\ \\hline\n");
        conv.state.in_table_row = false;
    }

    conv.buf.push_str("\\end{tabular}\n");
    let caption = match conv.state.table_caption.take() {
        Some(caption) => caption,
        None => {
            conv.state.table_idx += 1;
            format!("Table {}", conv.state.table_idx)
        }
    };
    conv.buf.push_str("\\caption{");
    conv.buf.push_escaped(&caption);
    conv.buf.push_str("}\n");
    if let Some(id_attr) = dom.attr(id, "id") {
        let _ = write!(conv.buf, "\\label{{tab:{id_attr}}}\n");
    }
    conv.buf.push_str("\\end{table}\n\n");

    conv.state.in_table = false;
    conv.state.in_table_cell = false;
    conv.state.table_columns = 0;
    conv.state.current_column = 0;
}

fn open_cell(conv: &mut LatexConverter, header: bool) -> Emission {
    if !conv.state.in_table {
        // Stray cell outside any table: contents still render.
        return Emission::NoOutput;
    }
    if !conv.state.in_table_row {
        // Cell without a row (e.g. `<table><td>`): start one.
        debug!("table cell outside a row, opening an implicit row");
        conv.state.in_table_row = true;
        conv.state.current_column = 0;
    }
    conv.state.current_column += 1;
    if conv.state.current_column > conv.state.table_columns {
        warn!(
            "row has more cells than the computed {} columns",
            conv.state.table_columns
        );
    }
    if conv.state.current_column > 1 {
        conv.buf.push_str(" & ");
    }
    if header {
        conv.buf.push_str("\\textbf{");
    }
    conv.state.in_table_cell = true;
    Emission::Emitted
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Emit `\includegraphics` for an `img`, downloading it first when a
/// directory is configured. Width/height come from the inline style
/// when present, else from the HTML attributes.
fn emit_image(conv: &mut LatexConverter, dom: &Dom, id: NodeId, props: &Properties) {
    let Some(src) = dom.attr(id, "src") else {
        return;
    };
    // Inline base64 payloads have no file to reference.
    if src.starts_with("data:") && src.contains("base64") {
        return;
    }

    let width = dimension(props, dom, id, "width");
    let height = dimension(props, dom, id, "height");

    let path = fetch_or_fallback(conv, src);

    conv.buf.push_str("\\includegraphics");
    if width != 0 || height != 0 {
        conv.buf.push_char('[');
        if width != 0 {
            let _ = write!(conv.buf, "width={width}pt");
        }
        if height != 0 {
            if width != 0 {
                conv.buf.push_char(',');
            }
            let _ = write!(conv.buf, "height={height}pt");
        }
        conv.buf.push_char(']');
    }
    conv.buf.push_char('{');
    conv.buf.push_href_escaped(&path);
    conv.buf.push_char('}');
}

fn dimension(props: &Properties, dom: &Dom, id: NodeId, name: &str) -> i32 {
    props
        .get(name)
        .or_else(|| dom.attr(id, name))
        .map(length_to_pt)
        .unwrap_or(0)
}

/// Download `src` into the configured directory, falling back to the
/// original URL on any failure.
fn fetch_or_fallback(conv: &mut LatexConverter, src: &str) -> String {
    if !conv.downloads_enabled() {
        return src.to_string();
    }
    let Some(dir) = conv.image_dir().cloned() else {
        return src.to_string();
    };

    conv.image_count += 1;
    conv.state.image_idx += 1;
    let seq = conv.image_count;
    let outcome = match conv.downloader.as_ref() {
        Some(downloader) => downloader.fetch(src, &dir, seq),
        None => return src.to_string(),
    };
    match outcome {
        Ok(local) => local.display().to_string(),
        Err(err) => {
            warn!(
                "image {} download failed for {src}: {err}; keeping the original URL",
                conv.state.image_idx
            );
            src.to_string()
        }
    }
}

/// Render an image-only table as a centered figure holding its images.
fn emit_image_table_as_figure(conv: &mut LatexConverter, dom: &Dom, id: NodeId) {
    conv.state.figure_idx += 1;
    conv.buf.push_str("\\begin{figure}[h]\n\\centering\n");

    for img in collect_images(dom, id) {
        let style_props = dom
            .attr(img, "style")
            .map(parse_style)
            .unwrap_or_default();
        emit_image(conv, dom, img, &style_props);
        conv.buf.push_char('\n');
    }

    let caption = find_caption(dom, id)
        .unwrap_or_else(|| format!("Figure {}", conv.state.figure_idx));
    conv.buf.push_str("\\caption{");
    conv.buf.push_escaped(&caption);
    conv.buf.push_str("}\n\\end{figure}\n\n");
}

/// Every `img` descendant in document order.
fn collect_images(dom: &Dom, id: NodeId) -> Vec<NodeId> {
    let mut images = Vec::new();
    let mut stack: Vec<NodeId> = dom.node(id).children.iter().rev().copied().collect();
    while let Some(cur) = stack.pop() {
        if dom.tag(cur) == Some("img") {
            images.push(cur);
        }
        stack.extend(dom.node(cur).children.iter().rev().copied());
    }
    images
}

/// Text of the first `<caption>` descendant, if any.
fn find_caption(dom: &Dom, id: NodeId) -> Option<String> {
    let mut stack: Vec<NodeId> = dom.node(id).children.iter().rev().copied().collect();
    while let Some(cur) = stack.pop() {
        if dom.tag(cur) == Some("caption") {
            let text = dom.text_content(cur).trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
        stack.extend(dom.node(cur).children.iter().rev().copied());
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{LatexConverter, Options};

    fn body(tex: &str) -> String {
        let start = tex.find("\\begin{document}\n").unwrap() + "\\begin{document}\n".len();
        let end = tex.rfind("\n\\end{document}").unwrap();
        tex[start..end].to_string()
    }

    fn convert_body(html: &str) -> String {
        body(&LatexConverter::new(Options::new()).convert(html).unwrap())
    }

    #[test]
    fn test_headings() {
        assert_eq!(convert_body("<h1>A</h1>"), "\\section{A}\n\n");
        assert_eq!(convert_body("<h2>B</h2>"), "\\subsection{B}\n\n");
        assert_eq!(convert_body("<h3>C</h3>"), "\\subsubsection{C}\n\n");
        assert_eq!(convert_body("<h4>D</h4>"), "\\paragraph{D}\n\n");
        assert_eq!(convert_body("<h5>E</h5>"), "\\textbf{E}\n\n");
        assert_eq!(convert_body("<h6>F</h6>"), "\\textbf{F}\n\n");
    }

    #[test]
    fn test_inline_markup() {
        assert_eq!(convert_body("<p><b>a</b><i>b</i><u>c</u></p>"), "\\textbf{a}\\textit{b}\\underline{c}\n\n");
        assert_eq!(convert_body("<p><s>x</s></p>"), "\\sout{x}\n\n");
        assert_eq!(convert_body("<p><code>f()</code></p>"), "\\texttt{f()}\n\n");
        assert_eq!(
            convert_body("<p>H<sub>2</sub>O e=mc<sup>2</sup></p>"),
            "H\\textsubscript{2}O e=mc\\textsuperscript{2}\n\n"
        );
    }

    #[test]
    fn test_breaks_and_rules() {
        assert_eq!(convert_body("<p>a<br>b</p>"), "a\\\\\nb\n\n");
        assert_eq!(convert_body("<hr>"), "\\hrule\n");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            convert_body(r#"<a href="https://x/y">link</a>"#),
            "\\href{https://x/y}{link}"
        );
        // Anchor without href renders its content only.
        assert_eq!(convert_body(r#"<a name="here">text</a>"#), "text");
        // URL specials are escaped without touching the braces.
        assert_eq!(
            convert_body(r#"<a href="https://x/?a=1&amp;b=2">q</a>"#),
            "\\href{https://x/?a=1\\&b=2}{q}"
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            convert_body("<ul><li>a</li><li>b</li></ul>"),
            "\\begin{itemize}\n\\item a\n\\item b\n\\end{itemize}\n"
        );
        assert_eq!(
            convert_body("<ol><li>1</li></ol>"),
            "\\begin{enumerate}\n\\item 1\n\\end{enumerate}\n"
        );
    }

    #[test]
    fn test_nested_list() {
        assert_eq!(
            convert_body("<ul><li>a<ul><li>b</li></ul></li></ul>"),
            "\\begin{itemize}\n\\item a\\begin{itemize}\n\\item b\n\\end{itemize}\n\n\\end{itemize}\n"
        );
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            convert_body("<blockquote>wise</blockquote>"),
            "\\begin{quote}\nwise\\end{quote}\n"
        );
    }

    #[test]
    fn test_simple_table_generates_caption() {
        assert_eq!(
            convert_body("<table><tr><td>1</td><td>2</td></tr><tr><td>3</td><td>4</td></tr></table>"),
            "\\begin{table}[h]\n\\centering\n\\begin{tabular}{|c|c|}\n\\hline\n\
             1 & 2 \\\\ \\hline\n3 & 4 \\\\ \\hline\n\\end{tabular}\n\
             \\caption{Table 1}\n\\end{table}\n\n"
        );
    }

    #[test]
    fn test_table_counter_increments() {
        let html = "<table><tr><td>a</td></tr></table><table><tr><td>b</td></tr></table>";
        let b = convert_body(html);
        assert!(b.contains("\\caption{Table 1}"));
        assert!(b.contains("\\caption{Table 2}"));
    }

    #[test]
    fn test_table_caption_and_label() {
        let b = convert_body(
            r#"<table id="data"><caption>Results</caption><tr><th>h</th></tr></table>"#,
        );
        assert!(b.contains("\\caption{Results}\n\\label{tab:data}\n"));
        // Header cells are bold, caption text does not leak into cells.
        assert!(b.contains("\\textbf{h}"));
        assert!(!b.contains("Results \\\\"));
    }

    #[test]
    fn test_table_sections_are_transparent() {
        let b = convert_body(
            "<table><thead><tr><th>H</th></tr></thead><tbody><tr><td>c</td></tr></tbody></table>",
        );
        assert!(b.contains("\\textbf{H} \\\\ \\hline\nc \\\\ \\hline\n"));
    }

    #[test]
    fn test_cell_background_uses_cellcolor() {
        let b = convert_body(
            r#"<table><tr><td style="background-color: red">x</td></tr></table>"#,
        );
        assert!(b.contains("\\cellcolor[HTML]{FF0000}{x}"));
        assert!(!b.contains("colorbox"));
    }

    #[test]
    fn test_cell_descendant_background_uses_cellcolor() {
        let b = convert_body(
            r#"<table><tr><td><span style="background-color: #0f0">y</span></td></tr></table>"#,
        );
        assert!(b.contains("\\cellcolor[HTML]{00FF00}{y}"));
    }

    #[test]
    fn test_malformed_table_cell_without_row() {
        let b = convert_body("<table><td>only</td></table>");
        assert!(b.contains("only"));
        assert!(b.contains("\\end{tabular}"));
    }

    #[test]
    fn test_image_without_download() {
        assert_eq!(
            convert_body(r#"<img src="cat.png">"#),
            "\\includegraphics{cat.png}"
        );
    }

    #[test]
    fn test_image_dimensions_from_attributes() {
        assert_eq!(
            convert_body(r#"<img src="cat.png" width="96" height="48">"#),
            "\\includegraphics[width=72pt,height=36pt]{cat.png}"
        );
    }

    #[test]
    fn test_image_dimensions_style_preferred() {
        assert_eq!(
            convert_body(r#"<img src="cat.png" style="width: 10pt" width="96">"#),
            "\\includegraphics[width=10pt]{cat.png}"
        );
    }

    #[test]
    fn test_data_url_image_skipped() {
        assert_eq!(
            convert_body(r#"<img src="data:image/png;base64,AAAA">"#),
            ""
        );
    }

    #[test]
    fn test_image_background_color_wraps_colorbox() {
        assert_eq!(
            convert_body(r#"<img src="cat.png" style="background-color: #ff0">"#),
            "\\colorbox[HTML]{FFFF00}{\\includegraphics{cat.png}}"
        );
    }

    #[test]
    fn test_image_only_table_becomes_figure() {
        let b = convert_body(
            r#"<table><tr><td><img src="a.png"></td><td><img src="b.png"></td></tr></table>"#,
        );
        assert_eq!(
            b,
            "\\begin{figure}[h]\n\\centering\n\
             \\includegraphics{a.png}\n\\includegraphics{b.png}\n\
             \\caption{Figure 1}\n\\end{figure}\n\n"
        );
    }

    #[test]
    fn test_image_table_uses_caption_text() {
        let b = convert_body(
            r#"<table><caption>Gallery</caption><tr><td><img src="a.png"></td></tr></table>"#,
        );
        assert!(b.contains("\\caption{Gallery}"));
        assert!(b.contains("\\begin{figure}"));
        assert!(!b.contains("tabular"));
    }

    #[test]
    fn test_transparent_wrappers() {
        assert_eq!(convert_body("<div><span>x</span></div>"), "x");
        assert_eq!(convert_body("<section><p>y</p></section>"), "y\n\n");
    }
}
