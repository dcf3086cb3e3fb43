//! Placeholder substitution for embedded guest templates
//!
//! Templates mark holes as `__PW_NAME__`, where the name is upper case with
//! digits and underscores. Values are already valid JavaScript (see
//! [`crate::escape`]). Substitution is a single left-to-right pass, so text
//! inside a substituted value is never treated as a hole.

const PREFIX: &str = "__PW_";
const SUFFIX: &str = "__";

/// Fill every `__PW_<name>__` hole in `source`.
///
/// A hole with no value is left as is; debug builds panic on it.
pub fn render(source: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut rest = source;

    while let Some(start) = rest.find(PREFIX) {
        out.push_str(&rest[..start]);
        let after = &rest[start + PREFIX.len()..];
        let run = after
            .bytes()
            .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
            .count();

        let hole = after[..run]
            .strip_suffix(SUFFIX)
            .filter(|name| !name.is_empty())
            .and_then(|name| values.iter().find(|(n, _)| *n == name));

        match hole {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after[run..];
            }
            None => {
                if cfg!(debug_assertions) {
                    panic!("unfilled placeholder in guest template: {PREFIX}{}", &after[..run]);
                }
                out.push_str(PREFIX);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_every_occurrence() {
        let out = render(
            "var a = __PW_X__; var b = __PW_X__ + __PW_Y__;",
            &[("X", "1"), ("Y", "2")],
        );
        assert_eq!(out, "var a = 1; var b = 1 + 2;");
    }

    #[test]
    fn test_render_names_with_underscores() {
        let out = render("f(__PW_HTML_LIMIT__)", &[("HTML_LIMIT", "300")]);
        assert_eq!(out, "f(300)");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let out = render(
            "a(__PW_CODE__); b(__PW_SEND__);",
            &[("CODE", r#""__PW_SEND__""#), ("SEND", "send")],
        );
        assert_eq!(out, r#"a("__PW_SEND__"); b(send);"#);
    }

    #[test]
    fn test_lowercase_markers_are_plain_text() {
        let out = render("this.__pwMethod = m;", &[]);
        assert_eq!(out, "this.__pwMethod = m;");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "unfilled placeholder")]
    fn test_missing_value_is_caught_in_debug() {
        render("__PW_MISSING__", &[]);
    }
}
