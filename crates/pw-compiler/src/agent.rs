//! Per-page agent state and the envelope bridge
//!
//! Every installer records itself on one page-global record,
//! `window.__pwAgent`. A navigation discards the page and with it the record,
//! so each load starts clean and a second injection into the same load finds
//! its guard already set and returns.

use crate::escape::js_string;

/// Page-global record holding installer guards and shared guest state.
pub const AGENT_RECORD: &str = "window.__pwAgent";

/// Expression that delivers one envelope string to the host.
pub const DEFAULT_POST_MESSAGE: &str = "window.ipc.postMessage";

/// Idempotence guards, one per installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    HideStyle,
    PopupGuard,
    FilterLoop,
    Console,
    Network,
    Translation,
    UserScripts,
    /// Cleared again on teardown so the inspector can be re-armed
    Inspector,
}

impl Guard {
    pub const ALL: [Guard; 8] = [
        Guard::HideStyle,
        Guard::PopupGuard,
        Guard::FilterLoop,
        Guard::Console,
        Guard::Network,
        Guard::Translation,
        Guard::UserScripts,
        Guard::Inspector,
    ];

    /// Field name on the agent record.
    pub fn field(self) -> &'static str {
        match self {
            Guard::HideStyle => "hideStyle",
            Guard::PopupGuard => "popupGuard",
            Guard::FilterLoop => "filterLoop",
            Guard::Console => "consoleHook",
            Guard::Network => "networkHook",
            Guard::Translation => "translation",
            Guard::UserScripts => "userScripts",
            Guard::Inspector => "inspector",
        }
    }

    /// Statement prologue for an installer body. Binds `agent` and returns
    /// early when this installer already ran on the current page load.
    pub fn prelude(self) -> String {
        let field = self.field();
        format!(
            "var agent = {AGENT_RECORD} || ({AGENT_RECORD} = {{}}); \
             if (agent.{field}) return; agent.{field} = true;"
        )
    }
}

/// How guest code reaches the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    post_message: String,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(DEFAULT_POST_MESSAGE)
    }
}

impl Bridge {
    /// `post_message` is a guest expression callable with one string.
    /// A blank expression falls back to the default bridge.
    pub fn new(post_message: impl Into<String>) -> Self {
        let post_message = post_message.into();
        let post_message = match post_message.trim() {
            "" => DEFAULT_POST_MESSAGE.to_string(),
            trimmed => trimmed.to_string(),
        };
        Self { post_message }
    }

    pub fn post_message(&self) -> &str {
        &self.post_message
    }

    /// Function expression `(type, payload)` that serializes one envelope
    /// and posts it. Failures are swallowed; a broken bridge must not break
    /// the page.
    pub fn send_fn(&self) -> String {
        format!(
            "function (type, payload) {{ try {{ {}(JSON.stringify({{ type: type, payload: payload }})); }} catch (e) {{}} }}",
            self.post_message
        )
    }

    /// Statement posting one envelope right away.
    pub fn send_statement(&self, kind: &str, payload_expr: &str) -> String {
        format!("({})({}, {});", self.send_fn(), js_string(kind), payload_expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_fields_are_distinct() {
        let mut fields: Vec<_> = Guard::ALL.iter().map(|g| g.field()).collect();
        fields.sort_unstable();
        fields.dedup();
        assert_eq!(fields.len(), Guard::ALL.len());
    }

    #[test]
    fn prelude_checks_and_sets_its_field() {
        let prelude = Guard::Console.prelude();
        assert!(prelude.starts_with("var agent = window.__pwAgent || (window.__pwAgent = {});"));
        assert!(prelude.contains("if (agent.consoleHook) return;"));
        assert!(prelude.ends_with("agent.consoleHook = true;"));
    }

    #[test]
    fn bridge_defaults_and_trims() {
        assert_eq!(Bridge::default().post_message(), DEFAULT_POST_MESSAGE);
        assert_eq!(Bridge::new("  ").post_message(), DEFAULT_POST_MESSAGE);
        assert_eq!(
            Bridge::new(" window.chrome.webview.postMessage ").post_message(),
            "window.chrome.webview.postMessage"
        );
    }

    #[test]
    fn send_fn_wraps_the_bridge() {
        let send = Bridge::new("window.sink").send_fn();
        assert!(send.contains("window.sink(JSON.stringify({ type: type, payload: payload }))"));
        assert!(send.contains("catch (e) {}"));
    }

    #[test]
    fn send_statement_quotes_the_kind() {
        let stmt = Bridge::default().send_statement("VIEW_SOURCE", "document.title");
        assert!(stmt.ends_with(r#")("VIEW_SOURCE", document.title);"#));
    }
}
