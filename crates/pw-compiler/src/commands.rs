//! Host→guest command scripts
//!
//! Each [`GuestCommand`] compiles to one self-contained "run now" script.
//! Commands never return a value to the host; those that answer do so with a
//! later envelope through the bridge.

use serde_json::json;

use pw_core::guest::GuestProfile;
use pw_core::protocol::{GuestCommand, StorageArea, StorageOp};

use crate::agent::{Bridge, Guard, AGENT_RECORD};
use crate::escape::{js_string, js_value};
use crate::stylesheet::DARK_MODE_CSS;
use crate::template::render;

const STORAGE_JS: &str = include_str!("../js/storage.js");
const INSPECTOR_JS: &str = include_str!("../js/inspector.js");
const FIND_JS: &str = include_str!("../js/find.js");
const READER_JS: &str = include_str!("../js/reader.js");
const IMAGES_JS: &str = include_str!("../js/images.js");
const CLEAR_DATA_JS: &str = include_str!("../js/clear_data.js");
const ENABLE_COPY_JS: &str = include_str!("../js/enable_copy.js");
const DARK_MODE_JS: &str = include_str!("../js/dark_mode.js");
const TRANSLATION_JS: &str = include_str!("../js/translation.js");

/// Outer markup preview sent with an inspected element.
pub const INSPECT_HTML_LIMIT: usize = 300;
/// Document markup sent for view-source.
pub const SOURCE_LIMIT: usize = 20_000;
/// Body text handed to speech.
pub const SPEAK_LIMIT: usize = 1_000;

const DARK_MODE_STYLE_ID: &str = "pw-dark-mode";

/// Compile `command` into a script for the renderer's "run now" hook.
pub fn command_script(command: &GuestCommand, bridge: &Bridge, profile: &GuestProfile) -> String {
    match command {
        GuestCommand::NetworkCapture { enabled } => {
            format!("({AGENT_RECORD} || ({AGENT_RECORD} = {{}})).captureNetwork = {enabled};")
        }
        GuestCommand::Storage { area, op } => storage(bridge, Some((*area, op))),
        GuestCommand::ReadStorage => storage(bridge, None),
        GuestCommand::Inspector { enabled: true } => render(
            INSPECTOR_JS,
            &[
                ("GUARD", &Guard::Inspector.prelude()),
                ("SEND", &bridge.send_fn()),
                ("HTML_LIMIT", &INSPECT_HTML_LIMIT.to_string()),
            ],
        ),
        GuestCommand::Inspector { enabled: false } => oneshot(&format!(
            "var agent = {AGENT_RECORD}; \
             if (agent && agent.inspector && agent.inspector.teardown) agent.inspector.teardown();"
        )),
        GuestCommand::Find { query } => render(
            FIND_JS,
            &[("SEND", &bridge.send_fn()), ("QUERY", &js_string(query))],
        ),
        GuestCommand::ExtractReader => {
            let reader = &profile.reader;
            let cfg = json!({
                "scriptRanges": reader.script_ranges,
                "minScriptChars": reader.min_script_chars,
                "excludedSelector": reader.excluded_selector,
                "forbiddenPhrases": reader.forbidden_phrases,
            });
            render(
                READER_JS,
                &[("SEND", &bridge.send_fn()), ("READER", &js_value(&cfg))],
            )
        }
        GuestCommand::ExtractImages => render(
            IMAGES_JS,
            &[
                ("SEND", &bridge.send_fn()),
                ("MIN_DIMENSION", &profile.images.min_dimension.to_string()),
            ],
        ),
        GuestCommand::ViewSource => oneshot(&bridge.send_statement(
            "VIEW_SOURCE",
            &format!("document.documentElement.outerHTML.substring(0, {SOURCE_LIMIT})"),
        )),
        GuestCommand::Speak => oneshot(&bridge.send_statement(
            "SPEAK_TEXT",
            &format!("(document.body ? document.body.innerText : '').substring(0, {SPEAK_LIMIT})"),
        )),
        GuestCommand::ClearSiteData => render(CLEAR_DATA_JS, &[("SEND", &bridge.send_fn())]),
        GuestCommand::DarkMode { enabled: true } => {
            render(DARK_MODE_JS, &[("CSS", &js_string(DARK_MODE_CSS))])
        }
        GuestCommand::DarkMode { enabled: false } => oneshot(&format!(
            "var style = document.getElementById({}); if (style) style.remove();",
            js_string(DARK_MODE_STYLE_ID)
        )),
        GuestCommand::AddHideRule { selector } => oneshot(&format!(
            "var agent = {AGENT_RECORD}; \
             if (agent && agent.addHideRule) agent.addHideRule({});",
            js_string(selector.trim())
        )),
        GuestCommand::EnableCopy => render(ENABLE_COPY_JS, &[("SEND", &bridge.send_fn())]),
        GuestCommand::Translation { enabled } => render(
            TRANSLATION_JS,
            &[
                ("ENABLED", &js_value(enabled)),
                ("LANG", &js_string(&profile.translate.target_language)),
            ],
        ),
    }
}

/// Storage mutation (or a plain read when `change` is `None`) followed by a
/// full snapshot.
fn storage(bridge: &Bridge, change: Option<(StorageArea, &StorageOp)>) -> String {
    const NULL: &str = "null";
    let (area, op, key, value) = match change {
        None => (NULL.to_string(), NULL, NULL.to_string(), NULL.to_string()),
        Some((area, op)) => {
            let area = js_string(area.as_str());
            match op {
                StorageOp::Set { key, value } => (area, "'SET'", js_string(key), js_string(value)),
                StorageOp::Delete { key } => (area, "'DELETE'", js_string(key), NULL.to_string()),
                StorageOp::Clear => (area, "'CLEAR'", NULL.to_string(), NULL.to_string()),
            }
        }
    };
    render(
        STORAGE_JS,
        &[
            ("SEND", &bridge.send_fn()),
            ("AREA", &area),
            ("OP", op),
            ("KEY", &key),
            ("VALUE", &value),
        ],
    )
}

fn oneshot(body: &str) -> String {
    format!("(function () {{ try {{ {body} }} catch (e) {{}} }})();")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(command: GuestCommand) -> String {
        command_script(&command, &Bridge::default(), &GuestProfile::default())
    }

    #[test]
    fn network_capture_sets_agent_flag() {
        assert_eq!(
            compile(GuestCommand::NetworkCapture { enabled: true }),
            "(window.__pwAgent || (window.__pwAgent = {})).captureNetwork = true;"
        );
        assert!(compile(GuestCommand::NetworkCapture { enabled: false }).ends_with("= false;"));
    }

    #[test]
    fn storage_set_escapes_key_and_value() {
        let script = compile(GuestCommand::Storage {
            area: StorageArea::Local,
            op: StorageOp::Set {
                key: "k'1".to_string(),
                value: "v\"2".to_string(),
            },
        });
        assert!(script.contains(r#"var area = "local";"#));
        assert!(script.contains("var op = 'SET';"));
        assert!(script.contains(r#"var key = "k'1";"#));
        assert!(script.contains(r#"var value = "v\"2";"#));
        assert!(script.contains("send('STORAGE_DATA'"));
    }

    #[test]
    fn storage_clear_targets_one_area() {
        let script = compile(GuestCommand::Storage {
            area: StorageArea::Session,
            op: StorageOp::Clear,
        });
        assert!(script.contains(r#"var area = "session";"#));
        assert!(script.contains("var op = 'CLEAR';"));
        assert!(script.contains("var key = null;"));
    }

    #[test]
    fn read_storage_only_snapshots() {
        let script = compile(GuestCommand::ReadStorage);
        assert!(script.contains("var area = null;"));
        assert!(script.contains("var op = null;"));
    }

    #[test]
    fn inspector_on_is_guarded_and_off_tears_down() {
        let on = compile(GuestCommand::Inspector { enabled: true });
        assert!(on.contains("if (agent.inspector) return;"));
        assert!(on.contains("substring(0, 300)"));
        assert!(on.contains("send('ELEMENT_INSPECTED'"));
        let off = compile(GuestCommand::Inspector { enabled: false });
        assert!(off.contains("agent.inspector.teardown()"));
    }

    #[test]
    fn find_embeds_query_as_string() {
        let script = compile(GuestCommand::Find {
            query: "a\"b\u{2028}".to_string(),
        });
        assert!(script.contains(r#"var query = "a\"b\u2028";"#));
        assert!(script.contains("send('FIND_RESULT', count);"));
        assert!(compile(GuestCommand::Find { query: String::new() }).contains(r#"var query = "";"#));
    }

    #[test]
    fn find_matches_original_text_case_insensitively() {
        let script = compile(GuestCommand::Find { query: "x".to_string() });
        assert!(script.contains("new RegExp("));
        assert!(script.contains("'gi')"));
        assert!(script.contains("marker.textContent = m[0];"));
        assert!(!script.contains("toLowerCase"));
    }

    #[test]
    fn reader_carries_profile() {
        let script = compile(GuestCommand::ExtractReader);
        assert!(script.contains(r#""minScriptChars":50"#));
        assert!(script.contains(r#""scriptRanges":[[1536,1791]]"#));
        assert!(script.contains("send('READER_ERROR', null);"));
    }

    #[test]
    fn images_use_min_dimension() {
        let mut profile = GuestProfile::default();
        profile.images.min_dimension = 320;
        let script = command_script(&GuestCommand::ExtractImages, &Bridge::default(), &profile);
        assert!(script.contains("var MIN = 320;"));
    }

    #[test]
    fn view_source_and_speak_truncate() {
        let source = compile(GuestCommand::ViewSource);
        assert!(source.contains("outerHTML.substring(0, 20000)"));
        assert!(source.contains(r#""VIEW_SOURCE""#));
        let speak = compile(GuestCommand::Speak);
        assert!(speak.contains("substring(0, 1000)"));
        assert!(speak.contains(r#""SPEAK_TEXT""#));
    }

    #[test]
    fn dark_mode_adds_and_removes_style() {
        let on = compile(GuestCommand::DarkMode { enabled: true });
        assert!(on.contains("'pw-dark-mode'"));
        assert!(on.contains("hue-rotate(180deg)"));
        let off = compile(GuestCommand::DarkMode { enabled: false });
        assert!(off.contains(r#"document.getElementById("pw-dark-mode")"#));
        assert!(off.contains("style.remove()"));
    }

    #[test]
    fn add_hide_rule_escapes_selector() {
        let script = compile(GuestCommand::AddHideRule {
            selector: r#" a[href*="x"] "#.to_string(),
        });
        assert!(script.contains(r#"agent.addHideRule("a[href*=\"x\"]")"#));
    }

    #[test]
    fn translation_sets_cookie_then_reloads() {
        let on = compile(GuestCommand::Translation { enabled: true });
        assert!(on.contains("var enabled = true;"));
        assert!(on.contains(r#"'/auto/' + "ar""#));
        assert!(on.contains("location.reload()"));
        assert!(compile(GuestCommand::Translation { enabled: false }).contains("var enabled = false;"));
    }

    #[test]
    fn action_commands_confirm() {
        assert!(compile(GuestCommand::ClearSiteData).contains("send('ACTION_COMPLETE'"));
        assert!(compile(GuestCommand::EnableCopy).contains("send('ACTION_COMPLETE'"));
    }

    #[test]
    fn custom_bridge_reaches_command_scripts() {
        let bridge = Bridge::new("window.chrome.webview.postMessage");
        let script = command_script(&GuestCommand::ReadStorage, &bridge, &GuestProfile::default());
        assert!(script.contains("window.chrome.webview.postMessage(JSON.stringify("));
    }
}
