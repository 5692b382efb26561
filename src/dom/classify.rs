// Tag classification and table shape predicates.
//
// The membership tables are static sorted slices searched with
// `binary_search`; each tag belongs to at most one of the block /
// inline / void / excluded sets.

use super::{Dom, NodeData, NodeId};

/// Block-level elements that break the surrounding text flow.
static BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "div",
    "figure",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "li",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "tfoot",
    "thead",
    "tr",
    "ul",
];

/// Inline phrasing elements.
static INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "cite", "code", "em", "i", "mark", "q", "small", "span", "strong", "sub",
    "sup", "tt", "u", "var",
];

/// Void elements: no close tag, no children.
static VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Subtrees that produce no output at all; descendants are not visited.
static EXCLUDED_TAGS: &[&str] = &[
    "embed", "head", "iframe", "link", "meta", "noscript", "object", "param", "script",
    "style", "title",
];

/// Elements allowed inside a table that is still "images only":
/// structural table parts and neutral inline wrappers.
static TABLE_LAYOUT_TAGS: &[&str] = &[
    "a", "caption", "center", "span", "table", "tbody", "td", "th", "tr",
];

fn member(set: &[&str], tag: &str) -> bool {
    set.binary_search(&tag).is_ok()
}

pub fn is_block(tag: &str) -> bool {
    member(BLOCK_TAGS, tag)
}

pub fn is_inline(tag: &str) -> bool {
    member(INLINE_TAGS, tag)
}

pub fn is_void(tag: &str) -> bool {
    member(VOID_TAGS, tag)
}

/// True for subtrees that are skipped entirely (scripts, styles,
/// document metadata).
pub fn should_exclude(tag: &str) -> bool {
    member(EXCLUDED_TAGS, tag)
}

pub fn is_whitespace_only(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_whitespace())
}

/// A `table` nested inside another `table` is skipped rather than
/// emitted as a nested `tabular`.
pub fn should_skip_nested_table(dom: &Dom, id: NodeId) -> bool {
    dom.tag(id) == Some("table") && dom.has_ancestor(id, "table")
}

/// True when every meaningful descendant of the table is an image:
/// such tables are presentational galleries and are converted to a
/// `figure` instead of a `tabular`.
pub fn table_contains_only_images(dom: &Dom, id: NodeId) -> bool {
    if dom.tag(id) != Some("table") {
        return false;
    }
    let mut saw_image = false;
    let mut work: Vec<NodeId> = dom.node(id).children.to_vec();
    while let Some(cur) = work.pop() {
        match &dom.node(cur).data {
            NodeData::Text(t) => {
                if !is_whitespace_only(t) {
                    return false;
                }
            }
            NodeData::Element { name, .. } => {
                if name == "img" {
                    saw_image = true;
                } else if name == "caption" {
                    // Caption text becomes the figure caption; it does
                    // not disqualify the table.
                } else if member(TABLE_LAYOUT_TAGS, name) {
                    work.extend(dom.node(cur).children.iter().copied());
                } else {
                    return false;
                }
            }
        }
    }
    saw_image
}

/// Number of columns of a table: the maximum over its rows of the
/// summed `colspan` values (1 per cell by default). `caption` is
/// ignored; `thead`/`tbody`/`tfoot` are transparent.
pub fn count_table_columns(dom: &Dom, id: NodeId) -> usize {
    let mut max_columns = 0usize;
    let mut work: Vec<NodeId> = dom.node(id).children.to_vec();
    while let Some(cur) = work.pop() {
        match dom.tag(cur) {
            Some("tr") => {
                let row: usize = dom
                    .node(cur)
                    .children
                    .iter()
                    .filter(|&&c| matches!(dom.tag(c), Some("td" | "th")))
                    .map(|&c| {
                        dom.attr(c, "colspan")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .filter(|&n| n > 0)
                            .unwrap_or(1)
                    })
                    .sum();
                max_columns = max_columns.max(row);
            }
            Some("thead" | "tbody" | "tfoot") => {
                work.extend(dom.node(cur).children.iter().copied());
            }
            _ => {}
        }
    }
    max_columns.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parser::parse;

    #[test]
    fn test_tables_are_sorted() {
        for set in [
            BLOCK_TAGS,
            INLINE_TAGS,
            VOID_TAGS,
            EXCLUDED_TAGS,
            TABLE_LAYOUT_TAGS,
        ] {
            let mut sorted = set.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, set);
        }
    }

    #[test]
    fn test_classification() {
        assert!(is_block("p"));
        assert!(is_block("blockquote"));
        assert!(is_inline("span"));
        assert!(is_inline("code"));
        assert!(is_void("br"));
        assert!(is_void("img"));
        assert!(should_exclude("script"));
        assert!(should_exclude("head"));
        assert!(!is_block("span"));
        assert!(!is_inline("div"));
        assert!(!is_void("p"));
        assert!(!should_exclude("p"));
    }

    #[test]
    fn test_whitespace_only() {
        assert!(is_whitespace_only(" \t\n"));
        assert!(is_whitespace_only(""));
        assert!(!is_whitespace_only(" x "));
    }

    #[test]
    fn test_nested_table_detection() {
        let dom = parse("<table><tr><td><table></table></td></tr></table>", false);
        let outer = dom.node(dom.root()).children[0];
        let inner = {
            let tr = dom.node(outer).children[0];
            let td = dom.node(tr).children[0];
            dom.node(td).children[0]
        };
        assert!(!should_skip_nested_table(&dom, outer));
        assert!(should_skip_nested_table(&dom, inner));
    }

    #[test]
    fn test_image_only_table() {
        let dom = parse(
            r##"<table><tr><td><img src="a.png"></td><td><a href="#"><img src="b.png"></a></td></tr></table>"##,
            false,
        );
        let table = dom.node(dom.root()).children[0];
        assert!(table_contains_only_images(&dom, table));
    }

    #[test]
    fn test_table_with_text_is_not_image_only() {
        let dom = parse(
            r#"<table><tr><td><img src="a.png">caption text</td></tr></table>"#,
            false,
        );
        let table = dom.node(dom.root()).children[0];
        assert!(!table_contains_only_images(&dom, table));
    }

    #[test]
    fn test_empty_table_is_not_image_only() {
        let dom = parse("<table><tr><td></td></tr></table>", false);
        let table = dom.node(dom.root()).children[0];
        assert!(!table_contains_only_images(&dom, table));
    }

    #[test]
    fn test_column_count_takes_row_maximum() {
        let dom = parse(
            "<table><tr><td>1</td><td>2</td></tr><tr><td>3</td></tr></table>",
            false,
        );
        let table = dom.node(dom.root()).children[0];
        assert_eq!(count_table_columns(&dom, table), 2);
    }

    #[test]
    fn test_column_count_honors_colspan_and_sections() {
        let dom = parse(
            r#"<table><thead><tr><th colspan="3">h</th></tr></thead><tbody><tr><td>a</td><td>b</td></tr></tbody></table>"#,
            false,
        );
        let table = dom.node(dom.root()).children[0];
        assert_eq!(count_table_columns(&dom, table), 3);
    }

    #[test]
    fn test_column_count_defaults_to_one() {
        let dom = parse("<table></table>", false);
        let table = dom.node(dom.root()).children[0];
        assert_eq!(count_table_columns(&dom, table), 1);
    }
}
