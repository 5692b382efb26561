// CSS value decoders: lengths to LaTeX points, colors to hex.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

/// Clamp range for decoded lengths, in points.
const PT_MIN: i32 = -10_000;
const PT_MAX: i32 = 10_000;

static LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    // Leading signed decimal, optional unit suffix.
    Regex::new(r"(?i)^\s*(-?\d+(?:\.\d+)?|-?\.\d+)\s*([a-z%]*)").unwrap()
});

static RGB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^rgba?\(\s*(-?\d+)\s*,\s*(-?\d+)\s*,\s*(-?\d+)\s*(?:,[^)]*)?\)$").unwrap()
});

/// Decode a CSS length to points.
///
/// Unit conversions are fixed: `px` at 72/96, `em`/`rem` at 10pt per em,
/// `%` at 4pt per percent (100% ≡ 400pt — an inherited constant kept for
/// output parity), metric units at 28.346pt per cm. A bare number or an
/// unknown unit is treated as `px`. The result is clamped to
/// ±10000pt. Returns 0 for unparseable input.
pub fn length_to_pt(input: &str) -> i32 {
    let input = strip_important(input);
    // Keywords carry no fixed length.
    if input.eq_ignore_ascii_case("auto") || input.eq_ignore_ascii_case("inherit") {
        return 0;
    }
    let Some(caps) = LENGTH.captures(input) else {
        if !input.trim().is_empty() {
            warn!("dropping unparseable CSS length {input:?}");
        }
        return 0;
    };
    let value: f64 = match caps[1].parse() {
        Ok(v) => v,
        Err(_) => return 0,
    };
    let unit = caps[2].to_ascii_lowercase();
    let pt = match unit.as_str() {
        "pt" => value,
        "em" | "rem" => value * 10.0,
        "%" => value * 4.0,
        "cm" => value * 28.346,
        "mm" => value * 2.8346,
        "in" => value * 72.0,
        // px, bare numbers, and unknown units all take the px rule.
        _ => value * 72.0 / 96.0,
    };
    (pt.round() as i64).clamp(PT_MIN as i64, PT_MAX as i64) as i32
}

/// Named CSS colors, sorted by name. `transparent` maps to white so
/// backgrounds resolve to "nothing to paint".
static NAMED_COLORS: &[(&str, &str)] = &[
    ("aqua", "00FFFF"),
    ("black", "000000"),
    ("blue", "0000FF"),
    ("cyan", "00FFFF"),
    ("fuchsia", "FF00FF"),
    ("gray", "808080"),
    ("green", "008000"),
    ("grey", "808080"),
    ("lime", "00FF00"),
    ("magenta", "FF00FF"),
    ("maroon", "800000"),
    ("navy", "000080"),
    ("olive", "808000"),
    ("orange", "FFA500"),
    ("purple", "800080"),
    ("red", "FF0000"),
    ("silver", "C0C0C0"),
    ("teal", "008080"),
    ("transparent", "FFFFFF"),
    ("white", "FFFFFF"),
    ("yellow", "FFFF00"),
];

fn strip_important(value: &str) -> &str {
    let trimmed = value.trim();
    match trimmed
        .to_ascii_lowercase()
        .strip_suffix("!important")
        .map(str::len)
    {
        Some(rest) => trimmed[..rest].trim_end(),
        None => trimmed,
    }
}

/// Decode a CSS color to a 6-digit uppercase hex string (no `#`).
///
/// Accepts `#RGB`, `#RRGGBB`, `rgb()`/`rgba()` (alpha ignored, channels
/// clamped to 0–255), and the common named colors. Anything else
/// resolves to black.
pub fn color_to_hex(input: &str) -> String {
    let value = strip_important(input);

    if let Some(hex) = value.strip_prefix('#') {
        match hex.len() {
            3 if hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                let mut out = String::with_capacity(6);
                for c in hex.chars() {
                    let up = c.to_ascii_uppercase();
                    out.push(up);
                    out.push(up);
                }
                return out;
            }
            6 if hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                return hex.to_ascii_uppercase();
            }
            _ => {}
        }
        warn!("dropping malformed hex color {input:?}");
        return "000000".to_string();
    }

    if let Some(caps) = RGB.captures(value) {
        let channel = |i: usize| -> u8 {
            caps[i]
                .parse::<i64>()
                .unwrap_or(0)
                .clamp(0, 255) as u8
        };
        return format!("{:02X}{:02X}{:02X}", channel(1), channel(2), channel(3));
    }

    let lower = value.to_ascii_lowercase();
    if let Ok(idx) = NAMED_COLORS.binary_search_by_key(&lower.as_str(), |&(n, _)| n) {
        return NAMED_COLORS[idx].1.to_string();
    }

    if !value.is_empty() {
        warn!("unknown CSS color {input:?}, using black");
    }
    "000000".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_units() {
        assert_eq!(length_to_pt("96px"), 72);
        assert_eq!(length_to_pt("10pt"), 10);
        assert_eq!(length_to_pt("1.5em"), 15);
        assert_eq!(length_to_pt("2rem"), 20);
        assert_eq!(length_to_pt("100%"), 400);
        assert_eq!(length_to_pt("1cm"), 28);
        assert_eq!(length_to_pt("10mm"), 28);
        assert_eq!(length_to_pt("1in"), 72);
    }

    #[test]
    fn test_length_bare_and_unknown_unit_as_px() {
        assert_eq!(length_to_pt("96"), 72);
        assert_eq!(length_to_pt("96vw"), 72);
    }

    #[test]
    fn test_length_clamp_and_garbage() {
        assert_eq!(length_to_pt("99999pt"), 10_000);
        assert_eq!(length_to_pt("-99999pt"), -10_000);
        assert_eq!(length_to_pt("auto"), 0);
        assert_eq!(length_to_pt(""), 0);
    }

    #[test]
    fn test_length_strips_important() {
        assert_eq!(length_to_pt("12pt !important"), 12);
    }

    #[test]
    fn test_length_negative_and_fractional() {
        assert_eq!(length_to_pt("-0.5em"), -5);
        assert_eq!(length_to_pt(".5in"), 36);
    }

    #[test]
    fn test_color_hex_forms() {
        assert_eq!(color_to_hex("#f00"), "FF0000");
        assert_eq!(color_to_hex("#aBc"), "AABBCC");
        assert_eq!(color_to_hex("#ff8000"), "FF8000");
        assert_eq!(color_to_hex("#FF8000"), "FF8000");
    }

    #[test]
    fn test_color_rgb_forms() {
        assert_eq!(color_to_hex("rgb(255, 128, 0)"), "FF8000");
        assert_eq!(color_to_hex("rgba(255,128,0,0.5)"), "FF8000");
        assert_eq!(color_to_hex("rgb(300, -5, 12)"), "FF000C");
    }

    #[test]
    fn test_color_named() {
        assert_eq!(color_to_hex("red"), "FF0000");
        assert_eq!(color_to_hex("Navy"), "000080");
        assert_eq!(color_to_hex("grey"), "808080");
        assert_eq!(color_to_hex("transparent"), "FFFFFF");
    }

    #[test]
    fn test_color_fallback_is_black() {
        assert_eq!(color_to_hex("#12"), "000000");
        assert_eq!(color_to_hex("blurple"), "000000");
        assert_eq!(color_to_hex(""), "000000");
    }

    #[test]
    fn test_color_strips_important() {
        assert_eq!(color_to_hex("red !important"), "FF0000");
    }

    #[test]
    fn test_named_table_sorted() {
        let mut names: Vec<_> = NAMED_COLORS.iter().map(|&(n, _)| n).collect();
        names.sort_unstable();
        assert_eq!(names, NAMED_COLORS.iter().map(|&(n, _)| n).collect::<Vec<_>>());
    }
}
