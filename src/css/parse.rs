// Inline style parsing and the cascade.
//
// `parse_style` turns a `style="…"` attribute into a `Properties` set,
// expanding the `margin` shorthand. `merge` computes the effective
// style of a child under inheritance and `!important`.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use super::{Properties, PropertyMask};

const MAX_KEY_LEN: usize = 128;
const MAX_VALUE_LEN: usize = 65_535;

/// Properties a child takes from its parent when it does not set them
/// itself.
static INHERITABLE_KEYS: &[&str] = &[
    "color",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "text-align",
    "text-decoration",
];

const INHERITABLE_MASK: PropertyMask = PropertyMask(
    PropertyMask::BOLD.0
        | PropertyMask::ITALIC.0
        | PropertyMask::UNDERLINE.0
        | PropertyMask::COLOR.0
        | PropertyMask::FONT_FAMILY.0
        | PropertyMask::FONT_SIZE.0
        | PropertyMask::TEXT_ALIGN.0,
);

pub(crate) fn is_inheritable(key: &str) -> bool {
    INHERITABLE_KEYS.binary_search(&key).is_ok()
}

static MARGIN_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:auto|inherit|-?(?:\d+(?:\.\d+)?|\.\d+)(?:px|pt|em|rem|%|cm|mm|in)?)$")
        .unwrap()
});

fn key_is_valid(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && !key.contains(['<', '>', ';', '"', '\''])
}

/// Strip a trailing `!important` (case-insensitive). Returns the value
/// without the marker and whether it was present.
fn split_important(value: &str) -> (&str, bool) {
    let trimmed = value.trim_end();
    let lower = trimmed.to_ascii_lowercase();
    if let Some(rest) = lower.strip_suffix("important") {
        if let Some(bang) = rest.trim_end().strip_suffix('!') {
            return (trimmed[..bang.len()].trim_end(), true);
        }
    }
    (trimmed, false)
}

/// Parse a `style` attribute value into a property set.
///
/// Invalid declarations are skipped silently (logged), never failing
/// the whole style.
pub fn parse_style(style: &str) -> Properties {
    let mut props = Properties::new();

    for declaration in style.split(';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        let Some((raw_key, raw_value)) = declaration.split_once(':') else {
            warn!("dropping CSS declaration without a colon: {declaration:?}");
            continue;
        };
        let key = raw_key.trim().to_ascii_lowercase();
        if !key_is_valid(&key) {
            warn!("dropping CSS declaration with invalid key {raw_key:?}");
            continue;
        }
        let (value, important) = split_important(raw_value.trim());
        if value.is_empty() {
            continue;
        }
        if value.len() > MAX_VALUE_LEN {
            warn!("dropping oversized CSS value for {key}");
            continue;
        }

        if key == "margin" {
            expand_margin(&mut props, value, important);
        } else {
            props.set(&key, value, important);
        }
    }

    props
}

/// Expand the 1/2/3/4-value `margin` shorthand into the four sides.
/// A token that is not a CSS length or `auto`/`inherit` drops the
/// whole declaration.
fn expand_margin(props: &mut Properties, value: &str, important: bool) {
    let tokens: Vec<&str> = value.split_ascii_whitespace().collect();
    if tokens.is_empty() || tokens.len() > 4 || !tokens.iter().all(|t| MARGIN_TOKEN.is_match(t)) {
        warn!("dropping invalid margin shorthand {value:?}");
        return;
    }
    let (top, right, bottom, left) = match tokens.as_slice() {
        [all] => (*all, *all, *all, *all),
        [tb, lr] => (*tb, *lr, *tb, *lr),
        [t, lr, b] => (*t, *lr, *b, *lr),
        [t, r, b, l] => (*t, *r, *b, *l),
        _ => unreachable!(),
    };
    props.set("margin-top", top, important);
    props.set("margin-right", right, important);
    props.set("margin-bottom", bottom, important);
    props.set("margin-left", left, important);
}

/// Compute the effective style of a child: inheritable parent
/// properties flow down, the child's own declarations override them —
/// unless the parent's declaration is `!important` and the child's is
/// not.
pub fn merge(parent: &Properties, child: &Properties) -> Properties {
    // Fast path: nothing inheritable on the parent side.
    if !parent.mask().intersects(INHERITABLE_MASK) {
        return child.clone();
    }

    let mut merged = Properties::new();
    for prop in parent.iter().filter(|p| is_inheritable(&p.key)) {
        merged.set(&prop.key, &prop.value, prop.important);
    }
    for prop in child.iter() {
        let parent_wins = merged
            .get_property(&prop.key)
            .is_some_and(|existing| existing.important && !prop.important);
        if !parent_wins {
            merged.set(&prop.key, &prop.value, prop.important);
        }
    }
    merged
}
