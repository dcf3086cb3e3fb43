//! CSS emitted into guest pages

use std::collections::HashSet;

use pw_core::rules::CSS_KILL_LIST;

/// Declarations applied to every hidden selector.
pub const HIDE_DECLARATIONS: &str = "{ display: none !important; visibility: hidden !important; }";

/// Forced dark mode: invert the page, then invert media back.
pub const DARK_MODE_CSS: &str = "html { filter: invert(100%) hue-rotate(180deg) !important; } \
img, video, iframe, canvas, :not(object):not(body) > embed, [style*=\"background-image\"] \
{ filter: invert(100%) hue-rotate(180deg) !important; }";

/// One rule hiding the builtin kill-list plus `custom`, in that order.
///
/// Blank and repeated selectors are skipped. The kill-list and custom
/// selectors share a single selector list, so one selector the engine cannot
/// parse drops the whole rule; selectors added on a live page are separate
/// rules and do not have that problem.
pub fn hide_rule<'a>(custom: impl IntoIterator<Item = &'a str>) -> String {
    let mut seen = HashSet::new();
    let selectors: Vec<&str> = CSS_KILL_LIST
        .iter()
        .copied()
        .chain(custom.into_iter().map(str::trim))
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .collect();
    format!("{} {HIDE_DECLARATIONS}", selectors.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hide_rule_includes_builtin_and_custom() {
        let rule = hide_rule([".promo", "#cookie-wall"]);
        for sel in CSS_KILL_LIST {
            assert!(rule.contains(sel), "missing {sel}");
        }
        assert!(rule.contains(".promo, #cookie-wall {"));
        assert_eq!(rule.matches(HIDE_DECLARATIONS).count(), 1);
    }

    #[test]
    fn hide_rule_skips_blank_and_duplicates() {
        let first = CSS_KILL_LIST[0];
        let rule = hide_rule([first, "  ", ".promo", " .promo "]);
        assert_eq!(rule.matches(".promo").count(), 1);
        assert!(!rule.contains(", ,"));
        assert_eq!(rule.split(", ").filter(|s| *s == first).count(), 1);
    }

    #[test]
    fn dark_mode_css_restores_media() {
        assert!(DARK_MODE_CSS.starts_with("html { filter: invert(100%)"));
        assert!(DARK_MODE_CSS.contains("img, video, iframe, canvas"));
    }
}
