//! WebAssembly bindings for PageWarden

use std::cell::RefCell;

use pw_compiler::{Bridge, InjectionComposer};
use pw_core::{GuestCommand, GuestProfile, InjectedScript, RequestGate};
use wasm_bindgen::prelude::*;

#[derive(Default)]
struct HostState {
    gate: RequestGate,
    composer: InjectionComposer,
}

thread_local! {
    static STATE: RefCell<HostState> = RefCell::new(HostState::default());
}

/// Set the envelope bridge expression and the guest profile.
///
/// `profile_json` is a partial profile document; missing fields keep their
/// defaults. Either argument may be omitted.
#[wasm_bindgen]
pub fn configure(post_message: Option<String>, profile_json: Option<String>) -> Result<(), JsValue> {
    let profile = match profile_json.as_deref() {
        Some(json) => Some(
            serde_json::from_str::<GuestProfile>(json)
                .map_err(|e| JsValue::from_str(&format!("Invalid guest profile: {}", e)))?,
        ),
        None => None,
    };
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        if let Some(expr) = post_message {
            state.composer.set_bridge(Bridge::new(expr));
        }
        if let Some(profile) = profile {
            state.composer.set_profile(profile);
        }
        web_sys::console::debug_1(&JsValue::from_str(&format!(
            "pw-wasm: bridge {}",
            state.composer.bridge().post_message()
        )));
    });
    Ok(())
}

#[wasm_bindgen]
pub fn get_info() -> JsValue {
    let result = js_sys::Object::new();
    STATE.with(|state| {
        let state = state.borrow();
        let _ = js_sys::Reflect::set(&result, &"version".into(), &JsValue::from_str(env!("CARGO_PKG_VERSION")));
        let _ = js_sys::Reflect::set(
            &result,
            &"bridge".into(),
            &JsValue::from_str(state.composer.bridge().post_message()),
        );
        let _ = js_sys::Reflect::set(
            &result,
            &"blockedCount".into(),
            &JsValue::from(state.gate.blocked_count() as f64),
        );
    });
    result.into()
}

// =============================================================================
// Request Gate
// =============================================================================

/// Admission check for one request. `user_blocked_domains` is an array of
/// strings; non-string entries are ignored.
#[wasm_bindgen]
pub fn should_block(url: &str, user_blocked_domains: JsValue) -> bool {
    let domains = string_array(&user_blocked_domains);
    STATE.with(|state| state.borrow().gate.check(url, &domains).is_block())
}

#[wasm_bindgen]
pub fn blocked_count() -> f64 {
    STATE.with(|state| state.borrow().gate.blocked_count() as f64)
}

#[wasm_bindgen]
pub fn reset_blocked_count() {
    STATE.with(|state| state.borrow().gate.reset_count());
}

// =============================================================================
// Guest Code
// =============================================================================

/// Bootstrap bundle for the "run before page script" hook.
///
/// `scripts_json` is the persisted script list.
#[wasm_bindgen]
pub fn compose_bootstrap(
    custom_selectors: JsValue,
    scripts_json: &str,
    translator_active: bool,
) -> Result<String, JsValue> {
    let selectors = string_array(&custom_selectors);
    let scripts: Vec<InjectedScript> = if scripts_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(scripts_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid script list: {}", e)))?
    };
    let bundle = STATE.with(|state| {
        state
            .borrow_mut()
            .composer
            .compose(&selectors, &scripts, translator_active)
    });
    Ok(bundle.to_string())
}

/// Script for one host→guest command, given as its JSON form
/// (`{"command": "find", "query": "..."}`).
#[wasm_bindgen]
pub fn command_script(command_json: &str) -> Result<String, JsValue> {
    let command: GuestCommand = serde_json::from_str(command_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid command: {}", e)))?;
    Ok(STATE.with(|state| {
        let state = state.borrow();
        pw_compiler::command_script(&command, state.composer.bridge(), state.composer.profile())
    }))
}

#[wasm_bindgen]
pub fn dark_mode_script(enabled: bool) -> String {
    STATE.with(|state| {
        let state = state.borrow();
        pw_compiler::command_script(
            &GuestCommand::DarkMode { enabled },
            state.composer.bridge(),
            state.composer.profile(),
        )
    })
}

// =============================================================================
// Envelopes
// =============================================================================

/// Validate one raw channel message. Returns the normalized
/// `{type, payload}` object, or `null` for anything unknown or malformed.
#[wasm_bindgen]
pub fn parse_envelope(raw: &str) -> JsValue {
    let Some(envelope) = pw_core::parse_envelope(raw) else {
        return JsValue::NULL;
    };
    match envelope.to_json() {
        Ok(json) => js_sys::JSON::parse(&json).unwrap_or(JsValue::NULL),
        Err(_) => JsValue::NULL,
    }
}

fn string_array(value: &JsValue) -> Vec<String> {
    if !js_sys::Array::is_array(value) {
        return Vec::new();
    }
    js_sys::Array::from(value)
        .iter()
        .filter_map(|v| v.as_string())
        .collect()
}
