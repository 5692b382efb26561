// Style applier: computed CSS → paired LaTeX wrappers.
//
// `apply` runs at element open and emits wrappers in a fixed order;
// what it opens is recorded in the converter state as owed closing
// braces (`open_braces`) and owed `\end{…}` lines (`open_environments`).
// `end` settles both debts at element close. `applied_props` guards
// against wrapping the same property twice for one element.

use std::fmt::Write;

use crate::buffer::LatexBuffer;
use crate::css::value::{color_to_hex, length_to_pt};
use crate::css::{Properties, PropertyMask};
use crate::dom::classify::is_block;

use super::ConverterState;

// Environment bits, closed low-to-high.
pub(crate) const ENV_CENTER: u8 = 1;
pub(crate) const ENV_FLUSH_RIGHT: u8 = 2;
pub(crate) const ENV_FLUSH_LEFT: u8 = 4;
pub(crate) const ENV_JUSTIFYING: u8 = 8;

/// Emit the opening wrappers for `props` on an element named `tag`.
pub(crate) fn apply(
    state: &mut ConverterState,
    buf: &mut LatexBuffer,
    props: &Properties,
    tag: &str,
) {
    let mask = props.mask();
    let block = is_block(tag);

    // 1. text-align — block elements outside table cells only.
    if pending(state, mask, PropertyMask::TEXT_ALIGN) && block && !state.in_table_cell {
        state.applied_props.insert(PropertyMask::TEXT_ALIGN);
        match props.get("text-align").map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("center") => {
                buf.push_str("\\begin{center}\n");
                state.open_environments |= ENV_CENTER;
            }
            Some(v) if v.eq_ignore_ascii_case("right") => {
                buf.push_str("\\begin{flushright}\n");
                state.open_environments |= ENV_FLUSH_RIGHT;
            }
            Some(v) if v.eq_ignore_ascii_case("left") => {
                buf.push_str("\\begin{flushleft}\n");
                state.open_environments |= ENV_FLUSH_LEFT;
            }
            Some(v) if v.eq_ignore_ascii_case("justify") => {
                buf.push_str("\\justifying\n");
                state.open_environments |= ENV_JUSTIFYING;
            }
            _ => {}
        }
    }

    // 2. color — skipped when it resolves to black.
    if pending(state, mask, PropertyMask::COLOR) {
        state.applied_props.insert(PropertyMask::COLOR);
        let hex = color_to_hex(props.get("color").unwrap_or(""));
        if hex != "000000" {
            let _ = write!(buf, "\\textcolor[HTML]{{{hex}}}{{");
            state.owe_brace();
        }
    }

    // 3. background-color — cell color inside tables, colorbox outside;
    //    skipped when it resolves to white.
    if pending(state, mask, PropertyMask::BACKGROUND) {
        state.applied_props.insert(PropertyMask::BACKGROUND);
        let hex = color_to_hex(props.get("background-color").unwrap_or(""));
        if hex != "FFFFFF" {
            let macro_name = if state.in_table_cell {
                "cellcolor"
            } else {
                "colorbox"
            };
            let _ = write!(buf, "\\{macro_name}[HTML]{{{hex}}}{{");
            state.owe_brace();
        }
    }

    // 4. margin-top, then margin-left — spacing commands, no brace owed.
    if block && !state.in_table_cell {
        if pending(state, mask, PropertyMask::MARGIN_TOP) {
            state.applied_props.insert(PropertyMask::MARGIN_TOP);
            let pt = length_to_pt(props.get("margin-top").unwrap_or(""));
            if pt != 0 {
                let _ = write!(buf, "\\vspace*{{{pt}pt}}\n");
            }
        }
        if pending(state, mask, PropertyMask::MARGIN_LEFT) {
            state.applied_props.insert(PropertyMask::MARGIN_LEFT);
            let pt = length_to_pt(props.get("margin-left").unwrap_or(""));
            if pt != 0 {
                let _ = write!(buf, "\\hspace*{{{pt}pt}}");
            }
        }
    }

    // 5. font-weight.
    if pending(state, mask, PropertyMask::BOLD) {
        state.applied_props.insert(PropertyMask::BOLD);
        if let Some(open) = font_weight_macro(props.get("font-weight").unwrap_or("")) {
            buf.push_str(open);
            state.owe_brace();
        }
    }

    // 6. font-style.
    if pending(state, mask, PropertyMask::ITALIC) {
        state.applied_props.insert(PropertyMask::ITALIC);
        let open = match props.get("font-style").map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("italic") => Some("\\textit{"),
            Some(v) if v.eq_ignore_ascii_case("oblique") => Some("\\textsl{"),
            Some(v) if v.eq_ignore_ascii_case("normal") => Some("\\textup{"),
            _ => None,
        };
        if let Some(open) = open {
            buf.push_str(open);
            state.owe_brace();
        }
    }

    // 7. font-family — the sans test runs before serif, since
    //    "sans-serif" contains "serif".
    if pending(state, mask, PropertyMask::FONT_FAMILY) {
        state.applied_props.insert(PropertyMask::FONT_FAMILY);
        let family = props.get("font-family").unwrap_or("").to_ascii_lowercase();
        let open = if family.contains("monospace") || family.contains("courier") {
            Some("\\texttt{")
        } else if family.contains("sans") || family.contains("arial") || family.contains("helvetica")
        {
            Some("\\textsf{")
        } else if family.contains("serif") || family.contains("times") {
            Some("\\textrm{")
        } else {
            None
        };
        if let Some(open) = open {
            buf.push_str(open);
            state.owe_brace();
        }
    }

    // 8. font-size — bucketed into the LaTeX size macros.
    if pending(state, mask, PropertyMask::FONT_SIZE) {
        state.applied_props.insert(PropertyMask::FONT_SIZE);
        let pt = length_to_pt(props.get("font-size").unwrap_or(""));
        let _ = write!(buf, "{{\\{} ", font_size_macro(pt));
        state.owe_brace();
    }

    // 9. text-decoration — the three decorations stack independently.
    if pending(state, mask, PropertyMask::UNDERLINE) {
        state.applied_props.insert(PropertyMask::UNDERLINE);
        let decoration = props
            .get("text-decoration")
            .unwrap_or("")
            .to_ascii_lowercase();
        for (needle, open) in [
            ("underline", "\\underline{"),
            ("line-through", "\\sout{"),
            ("overline", "\\overline{"),
        ] {
            if decoration.contains(needle) {
                buf.push_str(open);
                state.owe_brace();
            }
        }
    }

    // 10. border — only solid borders get a frame.
    if pending(state, mask, PropertyMask::BORDER) {
        state.applied_props.insert(PropertyMask::BORDER);
        if props
            .get("border")
            .unwrap_or("")
            .to_ascii_lowercase()
            .contains("solid")
        {
            buf.push_str("\\framebox{");
            state.owe_brace();
        }
    }
}

fn pending(state: &ConverterState, mask: PropertyMask, bit: PropertyMask) -> bool {
    mask.contains(bit) && !state.applied_props.contains(bit)
}

fn font_weight_macro(value: &str) -> Option<&'static str> {
    let value = value.trim().to_ascii_lowercase();
    if value.contains("bold") {
        return Some("\\textbf{");
    }
    if value.contains("lighter") {
        return Some("\\textmd{");
    }
    match value.parse::<i32>() {
        Ok(weight) if weight >= 600 => Some("\\textbf{"),
        Ok(weight) if weight <= 300 => Some("\\textmd{"),
        _ => None,
    }
}

fn font_size_macro(pt: i32) -> &'static str {
    match pt {
        i32::MIN..=8 => "tiny",
        9..=10 => "small",
        11..=12 => "normalsize",
        13..=14 => "large",
        15..=18 => "Large",
        19..=24 => "LARGE",
        _ => "huge",
    }
}

/// Close pending braces and environments and reset the applied mask.
/// Called when a text run has been emitted (wrappers bind to the first
/// text run under the styled element) and as part of `end`. While a
/// wrapper is still open, the applied mask keeps descendants from
/// re-wrapping an inherited property; once it closes, the next run
/// starts fresh.
pub(crate) fn close_wrappers(state: &mut ConverterState, buf: &mut LatexBuffer) {
    for _ in 0..state.open_braces {
        buf.push_char('}');
    }
    state.open_braces = 0;

    for (bit, close) in [
        (ENV_CENTER, "\\end{center}\n"),
        (ENV_FLUSH_RIGHT, "\\end{flushright}\n"),
        (ENV_FLUSH_LEFT, "\\end{flushleft}\n"),
        // `\justifying` is a declaration, not an environment; there is
        // nothing to close.
        (ENV_JUSTIFYING, ""),
    ] {
        if state.open_environments & bit != 0 {
            buf.push_str(close);
        }
    }
    state.open_environments = 0;
    state.applied_props.clear();
}

/// Emit the closing side for an element: trailing margins, owed braces
/// and environments, and the per-element idempotence reset.
pub(crate) fn end(
    state: &mut ConverterState,
    buf: &mut LatexBuffer,
    props: &Properties,
    tag: &str,
) {
    let mask = props.mask();
    if is_block(tag) && !state.in_table_cell {
        if pending(state, mask, PropertyMask::MARGIN_RIGHT) {
            state.applied_props.insert(PropertyMask::MARGIN_RIGHT);
            let pt = length_to_pt(props.get("margin-right").unwrap_or(""));
            if pt != 0 {
                let _ = write!(buf, "\\hspace*{{{pt}pt}}");
            }
        }
        if pending(state, mask, PropertyMask::MARGIN_BOTTOM) {
            state.applied_props.insert(PropertyMask::MARGIN_BOTTOM);
            let pt = length_to_pt(props.get("margin-bottom").unwrap_or(""));
            if pt > 0 {
                let _ = write!(buf, "\\vspace{{{pt}pt}}");
            } else if pt < 0 {
                let _ = write!(buf, "\\vspace*{{{pt}pt}}");
            }
        }
    }

    close_wrappers(state, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse::parse_style;

    fn run(style: &str, tag: &str, text: &str) -> String {
        let props = parse_style(style);
        let mut state = ConverterState::default();
        let mut buf = LatexBuffer::new();
        apply(&mut state, &mut buf, &props, tag);
        buf.push_escaped(text);
        end(&mut state, &mut buf, &props, tag);
        buf.into_string().unwrap()
    }

    #[test]
    fn test_color_wrapping() {
        assert_eq!(run("color: #f00", "span", "x"), "\\textcolor[HTML]{FF0000}{x}");
    }

    #[test]
    fn test_black_color_not_wrapped() {
        assert_eq!(run("color: black", "span", "x"), "x");
        assert_eq!(run("color: #000000", "span", "x"), "x");
    }

    #[test]
    fn test_background_color() {
        assert_eq!(
            run("background-color: yellow", "span", "x"),
            "\\colorbox[HTML]{FFFF00}{x}"
        );
        assert_eq!(run("background-color: white", "span", "x"), "x");
        assert_eq!(run("background-color: transparent", "span", "x"), "x");
    }

    #[test]
    fn test_background_in_table_cell_uses_cellcolor() {
        let props = parse_style("background-color: #ccc");
        let mut state = ConverterState {
            in_table_cell: true,
            ..Default::default()
        };
        let mut buf = LatexBuffer::new();
        apply(&mut state, &mut buf, &props, "td");
        assert_eq!(buf.as_str(), "\\cellcolor[HTML]{CCCCCC}{");
        assert_eq!(state.open_braces, 1);
    }

    #[test]
    fn test_text_align_environments() {
        assert_eq!(
            run("text-align: center", "p", "x"),
            "\\begin{center}\nx\\end{center}\n"
        );
        assert_eq!(
            run("text-align: right", "div", "x"),
            "\\begin{flushright}\nx\\end{flushright}\n"
        );
    }

    #[test]
    fn test_text_align_ignored_on_inline() {
        assert_eq!(run("text-align: center", "span", "x"), "x");
    }

    #[test]
    fn test_font_weight() {
        assert_eq!(run("font-weight: bold", "span", "x"), "\\textbf{x}");
        assert_eq!(run("font-weight: 700", "span", "x"), "\\textbf{x}");
        assert_eq!(run("font-weight: lighter", "span", "x"), "\\textmd{x}");
        assert_eq!(run("font-weight: 200", "span", "x"), "\\textmd{x}");
        assert_eq!(run("font-weight: normal", "span", "x"), "x");
        assert_eq!(run("font-weight: 400", "span", "x"), "x");
    }

    #[test]
    fn test_font_style() {
        assert_eq!(run("font-style: italic", "span", "x"), "\\textit{x}");
        assert_eq!(run("font-style: oblique", "span", "x"), "\\textsl{x}");
        assert_eq!(run("font-style: normal", "span", "x"), "\\textup{x}");
    }

    #[test]
    fn test_font_family() {
        assert_eq!(run("font-family: Courier New", "span", "x"), "\\texttt{x}");
        assert_eq!(run("font-family: sans-serif", "span", "x"), "\\textsf{x}");
        assert_eq!(run("font-family: Times, serif", "span", "x"), "\\textrm{x}");
    }

    #[test]
    fn test_font_size_buckets() {
        assert_eq!(run("font-size: 8pt", "span", "x"), "{\\tiny x}");
        assert_eq!(run("font-size: 10pt", "span", "x"), "{\\small x}");
        assert_eq!(run("font-size: 12pt", "span", "x"), "{\\normalsize x}");
        assert_eq!(run("font-size: 14pt", "span", "x"), "{\\large x}");
        assert_eq!(run("font-size: 18pt", "span", "x"), "{\\Large x}");
        assert_eq!(run("font-size: 24pt", "span", "x"), "{\\LARGE x}");
        assert_eq!(run("font-size: 30pt", "span", "x"), "{\\huge x}");
    }

    #[test]
    fn test_text_decoration_stacks() {
        assert_eq!(run("text-decoration: underline", "span", "x"), "\\underline{x}");
        assert_eq!(
            run("text-decoration: underline line-through", "span", "x"),
            "\\underline{\\sout{x}}"
        );
        assert_eq!(run("text-decoration: overline", "span", "x"), "\\overline{x}");
    }

    #[test]
    fn test_border_solid_framebox() {
        assert_eq!(run("border: 1px solid black", "div", "x"), "\\framebox{x}");
        assert_eq!(run("border: 1px dashed black", "div", "x"), "x");
    }

    #[test]
    fn test_margins() {
        assert_eq!(
            run("margin-top: 96px", "div", "x"),
            "\\vspace*{72pt}\nx"
        );
        assert_eq!(run("margin-left: 10pt", "div", "x"), "\\hspace*{10pt}x");
        assert_eq!(run("margin-bottom: 10pt", "div", "x"), "x\\vspace{10pt}");
        assert_eq!(run("margin-bottom: -10pt", "div", "x"), "x\\vspace*{-10pt}");
        assert_eq!(run("margin-right: 10pt", "div", "x"), "x\\hspace*{10pt}");
        assert_eq!(run("margin-top: 0", "div", "x"), "x");
    }

    #[test]
    fn test_margins_ignored_on_inline_elements() {
        assert_eq!(run("margin-top: 10pt", "span", "x"), "x");
    }

    #[test]
    fn test_emission_order_color_before_weight() {
        assert_eq!(
            run("font-weight: bold; color: red", "span", "x"),
            "\\textcolor[HTML]{FF0000}{\\textbf{x}}"
        );
    }

    #[test]
    fn test_applied_props_idempotence() {
        let props = parse_style("color: red");
        let mut state = ConverterState::default();
        let mut buf = LatexBuffer::new();
        apply(&mut state, &mut buf, &props, "span");
        apply(&mut state, &mut buf, &props, "span");
        assert_eq!(buf.as_str(), "\\textcolor[HTML]{FF0000}{");
        assert_eq!(state.open_braces, 1);
    }
}
