//! Splicing host values into guest code

use serde::Serialize;

/// Quote `s` as a JavaScript string literal.
#[inline]
pub fn js_string(s: &str) -> String {
    js_value(s)
}

/// Serialize `value` as a JavaScript expression.
///
/// JSON is valid JavaScript except for the raw line and paragraph
/// separators, which end a string literal in older engines; both are
/// re-escaped here.
pub fn js_value<T: Serialize + ?Sized>(value: &T) -> String {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("guest value failed to serialize: {e}");
            return "null".to_string();
        }
    };
    if json.contains(['\u{2028}', '\u{2029}']) {
        json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
    } else {
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_quotes_and_escapes() {
        assert_eq!(js_string("plain"), r#""plain""#);
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
        assert_eq!(js_string("</script>"), r#""</script>""#);
    }

    #[test]
    fn test_line_separators_are_escaped() {
        let out = js_string("a\u{2028}b\u{2029}c");
        assert_eq!(out, r#""a\u2028b\u2029c""#);
    }

    #[test]
    fn test_js_value() {
        assert_eq!(js_value(&true), "true");
        assert_eq!(js_value(&[1, 2]), "[1,2]");
        assert_eq!(js_value(&vec!["x".to_string()]), r#"["x"]"#);
    }
}
