//! Bootstrap bundle composition
//!
//! The bundle is delivered through the renderer's "run before page script"
//! hook on every navigation. Installers run in a fixed order:
//!
//! 1. hide stylesheet (builtin kill-list plus custom selectors)
//! 2. popup suppressor
//! 3. active filter loop
//! 4. console capture, then network capture
//! 5. translation widget, only while the translator is on
//! 6. user scripts
//!
//! Every installer is an IIFE guarded on the per-page agent record, so a
//! second delivery into the same page load changes nothing.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::{json, Value};
use twox_hash::XxHash64;

use pw_core::guest::{FilterProfile, GuestProfile, TranslateProfile};
use pw_core::scripts::InjectedScript;
use pw_core::session::SessionStore;
use pw_core::store::KeyValueStore;

use crate::agent::{Bridge, Guard};
use crate::escape::{js_string, js_value};
use crate::stylesheet::hide_rule;
use crate::template::render;

const HIDE_STYLE_JS: &str = include_str!("../js/hide_style.js");
const POPUP_GUARD_JS: &str = include_str!("../js/popup_guard.js");
const FILTER_LOOP_JS: &str = include_str!("../js/filter_loop.js");
const CONSOLE_HOOK_JS: &str = include_str!("../js/console_hook.js");
const NETWORK_HOOK_JS: &str = include_str!("../js/network_hook.js");
const TRANSLATE_WIDGET_JS: &str = include_str!("../js/translate_widget.js");
const USER_SCRIPTS_JS: &str = include_str!("../js/user_scripts.js");

/// Captured network bodies are cut to this many characters.
pub const NETWORK_BODY_LIMIT: usize = 1000;

/// Script that loads the third-party translation widget.
pub const TRANSLATE_WIDGET_SRC: &str =
    "https://translate.google.com/translate_a/element.js?cb=googleTranslateElementInit";

// =============================================================================
// Installers
// =============================================================================

pub fn hide_style<'a>(selectors: impl IntoIterator<Item = &'a str>) -> String {
    let css = hide_rule(selectors);
    render(
        HIDE_STYLE_JS,
        &[("GUARD", &Guard::HideStyle.prelude()), ("CSS", &js_string(&css))],
    )
}

pub fn popup_guard() -> String {
    render(POPUP_GUARD_JS, &[("GUARD", &Guard::PopupGuard.prelude())])
}

pub fn filter_loop(profile: &FilterProfile) -> String {
    render(
        FILTER_LOOP_JS,
        &[
            ("GUARD", &Guard::FilterLoop.prelude()),
            ("FILTER", &js_value(&filter_config(profile))),
        ],
    )
}

pub fn console_hook(bridge: &Bridge) -> String {
    render(
        CONSOLE_HOOK_JS,
        &[("GUARD", &Guard::Console.prelude()), ("SEND", &bridge.send_fn())],
    )
}

pub fn network_hook(bridge: &Bridge) -> String {
    render(
        NETWORK_HOOK_JS,
        &[
            ("GUARD", &Guard::Network.prelude()),
            ("SEND", &bridge.send_fn()),
            ("BODY_LIMIT", &NETWORK_BODY_LIMIT.to_string()),
        ],
    )
}

pub fn translate_widget(profile: &TranslateProfile) -> String {
    render(
        TRANSLATE_WIDGET_JS,
        &[
            ("GUARD", &Guard::Translation.prelude()),
            ("LANG", &js_string(&profile.target_language)),
            ("RTL", &js_value(&profile.right_to_left)),
            ("WIDGET_SRC", &js_string(TRANSLATE_WIDGET_SRC)),
        ],
    )
}

/// Runner for `scripts`. Inactive scripts are left out here; the domain
/// pattern is checked in the page against the live location.
pub fn user_scripts<'a>(
    bridge: &Bridge,
    scripts: impl IntoIterator<Item = &'a InjectedScript>,
) -> String {
    let entries: Vec<Value> = scripts
        .into_iter()
        .filter(|s| s.active)
        .map(|s| json!({ "name": s.name, "domain": s.domain_pattern, "code": s.code }))
        .collect();
    render(
        USER_SCRIPTS_JS,
        &[
            ("GUARD", &Guard::UserScripts.prelude()),
            ("SEND", &bridge.send_fn()),
            ("SCRIPTS", &js_value(&entries)),
        ],
    )
}

/// Guest-side shape of the filter profile. Word lists are lowercased because
/// the page compares them against lowercased text.
fn filter_config(profile: &FilterProfile) -> Value {
    let lower = |words: &[String]| -> Vec<String> {
        words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect()
    };
    json!({
        "debounceMs": profile.debounce_ms,
        "zIndexThreshold": profile.z_index_threshold,
        "minOverlayHeight": profile.min_overlay_height,
        "minOverlayTop": profile.min_overlay_top,
        "minTextLen": profile.min_text_len,
        "maxTextLen": profile.max_text_len,
        "badWords": lower(&profile.bad_words),
        "badLinks": lower(&profile.bad_links),
    })
}

// =============================================================================
// Composer
// =============================================================================

/// Builds the bootstrap bundle and remembers the last one.
///
/// The bundle is rebuilt only when the selectors, the active scripts or the
/// translator flag change; otherwise the previous `Arc` is handed out again.
#[derive(Debug, Clone, Default)]
pub struct InjectionComposer {
    bridge: Bridge,
    profile: GuestProfile,
    memo: Option<Memo>,
}

#[derive(Debug, Clone)]
struct Memo {
    fingerprint: u64,
    bundle: Arc<str>,
}

impl InjectionComposer {
    pub fn new(bridge: Bridge, profile: GuestProfile) -> Self {
        Self {
            bridge,
            profile,
            memo: None,
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn profile(&self) -> &GuestProfile {
        &self.profile
    }

    pub fn set_bridge(&mut self, bridge: Bridge) {
        self.bridge = bridge;
        self.memo = None;
    }

    pub fn set_profile(&mut self, profile: GuestProfile) {
        self.profile = profile;
        self.memo = None;
    }

    /// The bootstrap bundle for these inputs.
    pub fn compose<'a, I, S>(
        &mut self,
        selectors: I,
        scripts: impl IntoIterator<Item = &'a InjectedScript>,
        translator_active: bool,
    ) -> Arc<str>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selectors: Vec<S> = selectors.into_iter().collect();
        let scripts: Vec<&InjectedScript> = scripts.into_iter().filter(|s| s.active).collect();
        let fingerprint = fingerprint(&selectors, &scripts, translator_active);

        if let Some(memo) = &self.memo {
            if memo.fingerprint == fingerprint {
                log::debug!("bootstrap bundle unchanged ({fingerprint:016x})");
                return Arc::clone(&memo.bundle);
            }
        }

        let bundle: Arc<str> = self
            .build(
                selectors.iter().map(|s| s.as_ref()),
                scripts.iter().copied(),
                translator_active,
            )
            .into();
        log::debug!(
            "composed bootstrap bundle: {} bytes, {} selectors, {} scripts, translator {}",
            bundle.len(),
            selectors.len(),
            scripts.len(),
            if translator_active { "on" } else { "off" }
        );
        self.memo = Some(Memo {
            fingerprint,
            bundle: Arc::clone(&bundle),
        });
        bundle
    }

    /// The bootstrap bundle for the session's current rules, scripts and
    /// translator flag.
    pub fn compose_for<S: KeyValueStore>(&mut self, session: &SessionStore<S>) -> Arc<str> {
        let profile = session.profile();
        self.compose(
            profile.rules.selectors(),
            profile.scripts.iter(),
            session.translator_active(),
        )
    }

    fn build<'a, 's>(
        &self,
        selectors: impl IntoIterator<Item = &'s str>,
        scripts: impl IntoIterator<Item = &'a InjectedScript>,
        translator_active: bool,
    ) -> String {
        let mut parts = vec![
            hide_style(selectors),
            popup_guard(),
            filter_loop(&self.profile.filter),
            console_hook(&self.bridge),
            network_hook(&self.bridge),
        ];
        if translator_active {
            parts.push(translate_widget(&self.profile.translate));
        }
        let scripts: Vec<&InjectedScript> = scripts.into_iter().collect();
        if !scripts.is_empty() {
            parts.push(user_scripts(&self.bridge, scripts));
        }
        parts.join("\n")
    }
}

fn fingerprint<S: AsRef<str>>(
    selectors: &[S],
    scripts: &[&InjectedScript],
    translator_active: bool,
) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    selectors.len().hash(&mut hasher);
    for selector in selectors {
        selector.as_ref().hash(&mut hasher);
    }
    scripts.len().hash(&mut hasher);
    for script in scripts {
        script.id.hash(&mut hasher);
        script.name.hash(&mut hasher);
        script.domain_pattern.hash(&mut hasher);
        script.code.hash(&mut hasher);
    }
    translator_active.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::rules::CSS_KILL_LIST;
    use pw_core::store::MemoryStore;

    fn script(name: &str, domain: &str, code: &str) -> InjectedScript {
        InjectedScript::new(name, domain, code).unwrap()
    }

    fn no_scripts() -> Vec<InjectedScript> {
        Vec::new()
    }

    #[test]
    fn bundle_hides_builtin_and_custom_selectors_in_one_rule() {
        let mut composer = InjectionComposer::default();
        let bundle = composer.compose([".promo", "#nag"], &no_scripts(), false);
        let rule_start = bundle.find("var baseRule = ").unwrap();
        let rule_line = bundle[rule_start..].lines().next().unwrap();
        for sel in CSS_KILL_LIST {
            assert!(rule_line.contains(&sel.replace('"', "\\\"")), "missing {sel}");
        }
        assert!(rule_line.contains(".promo, #nag {"));
        assert_eq!(rule_line.matches("display: none !important").count(), 1);
    }

    #[test]
    fn installers_run_in_order() {
        let mut composer = InjectionComposer::default();
        let bundle = composer.compose(Vec::<String>::new(), &no_scripts(), false);
        let pos = |g: Guard| {
            bundle
                .find(&format!("agent.{} = true;", g.field()))
                .unwrap_or_else(|| panic!("missing {g:?}"))
        };
        assert!(pos(Guard::HideStyle) < pos(Guard::PopupGuard));
        assert!(pos(Guard::PopupGuard) < pos(Guard::FilterLoop));
        assert!(pos(Guard::FilterLoop) < pos(Guard::Console));
        assert!(pos(Guard::Console) < pos(Guard::Network));
    }

    #[test]
    fn each_installer_carries_one_guard() {
        let mut composer = InjectionComposer::default();
        let scripts = vec![script("s", "*", "1;")];
        let bundle = composer.compose([".x"], &scripts, true);
        for guard in Guard::ALL {
            let check = format!("if (agent.{}) return;", guard.field());
            let expected = usize::from(guard != Guard::Inspector);
            assert_eq!(bundle.matches(&check).count(), expected, "{guard:?}");
        }
    }

    #[test]
    fn translation_only_when_active() {
        let mut composer = InjectionComposer::default();
        let off = composer.compose(Vec::<String>::new(), &no_scripts(), false);
        assert!(!off.contains(TRANSLATE_WIDGET_SRC));
        let on = composer.compose(Vec::<String>::new(), &no_scripts(), true);
        assert!(on.contains(TRANSLATE_WIDGET_SRC));
        assert!(on.contains(r#"var target = "ar";"#));
    }

    #[test]
    fn inactive_scripts_are_left_out() {
        let mut composer = InjectionComposer::default();
        let mut scripts = vec![
            script("keep", "*", "window.kept = 1;"),
            script("drop", "example.com", "window.dropped = 1;"),
        ];
        scripts[1].active = false;
        let bundle = composer.compose(Vec::<String>::new(), &scripts, false);
        assert!(bundle.contains("window.kept = 1;"));
        assert!(!bundle.contains("window.dropped"));
    }

    #[test]
    fn script_code_is_embedded_as_a_string() {
        let mut composer = InjectionComposer::default();
        let scripts = vec![script("quotes", "*", "alert(\"hi\");\n</script>")];
        let bundle = composer.compose(Vec::<String>::new(), &scripts, false);
        assert!(bundle.contains(r#""code":"alert(\"hi\");\n</script>""#));
        assert!(bundle.contains("new Function(script.code)()"));
    }

    #[test]
    fn no_runner_without_active_scripts() {
        let mut composer = InjectionComposer::default();
        let bundle = composer.compose(Vec::<String>::new(), &no_scripts(), false);
        assert!(!bundle.contains(Guard::UserScripts.field()));
    }

    #[test]
    fn memo_reuses_unchanged_bundle() {
        let mut composer = InjectionComposer::default();
        let scripts = vec![script("a", "*", "1;")];
        let first = composer.compose([".a"], &scripts, false);
        let second = composer.compose(vec![".a".to_string()], &scripts, false);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn memo_misses_on_any_input_change() {
        let mut composer = InjectionComposer::default();
        let mut scripts = vec![script("a", "*", "window.one = 1;")];
        let base = composer.compose([".a"], &scripts, false);

        let other = composer.compose([".b"], &scripts, false);
        assert!(!Arc::ptr_eq(&base, &other));

        let translated = composer.compose([".b"], &scripts, true);
        assert!(!Arc::ptr_eq(&other, &translated));

        scripts[0].code = "window.two = 2;".to_string();
        let edited = composer.compose([".b"], &scripts, true);
        assert!(!Arc::ptr_eq(&translated, &edited));

        scripts[0].active = false;
        let toggled = composer.compose([".b"], &scripts, true);
        assert!(!toggled.contains("window.two"));
    }

    #[test]
    fn profile_change_drops_memo() {
        let mut composer = InjectionComposer::default();
        let first = composer.compose([".a"], &no_scripts(), false);
        let mut profile = GuestProfile::default();
        profile.filter.debounce_ms = 250;
        composer.set_profile(profile);
        let second = composer.compose([".a"], &no_scripts(), false);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.contains(r#""debounceMs":250"#));
    }

    #[test]
    fn filter_config_uses_guest_names() {
        let mut profile = FilterProfile::default();
        profile.bad_words = vec![" Casino ".to_string(), "".to_string()];
        let cfg = filter_config(&profile);
        assert_eq!(cfg["zIndexThreshold"], 900);
        assert_eq!(cfg["maxTextLen"], 99);
        assert_eq!(cfg["badWords"], json!(["casino"]));
    }

    #[test]
    fn bridge_is_used_by_capture_installers() {
        let mut composer = InjectionComposer::new(Bridge::new("window.sink"), GuestProfile::default());
        let bundle = composer.compose(Vec::<String>::new(), &no_scripts(), false);
        assert_eq!(bundle.matches("window.sink(JSON.stringify(").count(), 2);
        assert!(bundle.contains("var LIMIT = 1000;"));
    }

    #[test]
    fn compose_for_reads_session_state() {
        let mut session = SessionStore::new(MemoryStore::new());
        session.add_block_rule(".from-session");
        session.create_script("s", "*", "window.fromSession = 1;").unwrap();
        session.toggle_translator();

        let mut composer = InjectionComposer::default();
        let bundle = composer.compose_for(&session);
        assert!(bundle.contains(".from-session"));
        assert!(bundle.contains("window.fromSession = 1;"));
        assert!(bundle.contains(TRANSLATE_WIDGET_SRC));
    }
}
