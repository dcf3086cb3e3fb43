use std::time::Duration;

use serde_json::Value;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

use pw_compiler::{command_script, Bridge, InjectionComposer};
use pw_core::{GuestCommand, GuestProfile, InjectedScript};

const SINK: &str = "window.__pwE2eSink.push";

pub struct E2eOptions {
    pub chromedriver_url: String,
    pub page_url: String,
    pub headless: bool,
}

pub fn run_e2e(opts: E2eOptions) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_e2e_async(opts))
}

async fn run_e2e_async(opts: E2eOptions) -> Result<(), String> {
    let mut caps = ChromeCapabilities::new();
    caps.add_arg("--no-first-run")
        .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    caps.add_arg("--no-default-browser-check")
        .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    if opts.headless {
        caps.add_arg("--headless=new")
            .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
        caps.add_arg("--disable-gpu")
            .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    }

    let driver = WebDriver::new(&opts.chromedriver_url, caps)
        .await
        .map_err(|e| format!("Failed to connect to chromedriver: {}", e))?;

    driver
        .goto(&opts.page_url)
        .await
        .map_err(|e| format!("Failed to navigate to {}: {}", opts.page_url, e))?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut composer = InjectionComposer::new(Bridge::new(SINK), GuestProfile::default());
    let probe = InjectedScript::new("probe", "*", "window.__pwProbe = (window.__pwProbe || 0) + 1;")
        .map_err(|e| format!("Failed to build probe script: {}", e))?;
    let bundle = composer.compose([".pw-e2e-hidden"], [&probe], false);

    let mut errors = Vec::new();

    if let Err(e) = install_bundle(&driver, &bundle).await {
        errors.push(format!("Bundle install failed: {}", e));
    }

    if let Err(e) = check_bundle_installed(&driver).await {
        errors.push(format!("Installer check failed: {}", e));
    }

    if let Err(e) = check_reinjection_is_noop(&driver, &bundle).await {
        errors.push(format!("Re-injection check failed: {}", e));
    }

    if let Err(e) = check_find_round_trip(&driver).await {
        errors.push(format!("Find check failed: {}", e));
    }

    driver.quit().await.ok();

    if errors.is_empty() {
        println!("✓ E2E checks passed");
        Ok(())
    } else {
        Err(format!("E2E failed:\n- {}", errors.join("\n- ")))
    }
}

async fn install_bundle(driver: &WebDriver, bundle: &str) -> WebDriverResult<()> {
    driver
        .execute("window.__pwE2eSink = window.__pwE2eSink || [];", Vec::<Value>::new())
        .await?;
    driver.execute(bundle, Vec::<Value>::new()).await?;
    Ok(())
}

async fn check_bundle_installed(driver: &WebDriver) -> Result<(), String> {
    let checks = [
        ("hide stylesheet", "return !!document.getElementById('pw-hide-style');"),
        ("popup guard", "return window.open('https://example.org') === null;"),
        ("console hook", "return window.__pwAgent && window.__pwAgent.consoleHook === true;"),
        ("network hook", "return window.__pwAgent && window.__pwAgent.networkHook === true;"),
        ("filter loop", "return typeof (window.__pwAgent && window.__pwAgent.rescan) === 'function';"),
        ("user script", "return window.__pwProbe === 1;"),
    ];
    for (name, script) in checks {
        let ok = eval_bool(driver, script)
            .await
            .map_err(|e| format!("Failed to check {}: {}", name, e))?;
        if !ok {
            return Err(format!("{} not installed", name));
        }
    }
    Ok(())
}

async fn check_reinjection_is_noop(driver: &WebDriver, bundle: &str) -> Result<(), String> {
    install_bundle(driver, bundle)
        .await
        .map_err(|e| format!("Failed to re-inject: {}", e))?;
    driver
        .execute(
            "window.__pwE2eSink.length = 0; console.log('pw-e2e-once');",
            Vec::<Value>::new(),
        )
        .await
        .map_err(|e| format!("Failed to log: {}", e))?;
    let count = eval_number(
        driver,
        "return window.__pwE2eSink.filter(function (m) { return m.indexOf('pw-e2e-once') !== -1; }).length;",
    )
    .await
    .map_err(|e| format!("Failed to read sink: {}", e))?;
    if count != 1.0 {
        return Err(format!("expected one console envelope, got {}", count));
    }
    let probes = eval_number(driver, "return window.__pwProbe;")
        .await
        .map_err(|e| format!("Failed to read probe: {}", e))?;
    if probes != 1.0 {
        return Err(format!("user script ran {} times", probes));
    }
    Ok(())
}

async fn check_find_round_trip(driver: &WebDriver) -> Result<(), String> {
    let profile = GuestProfile::default();
    let bridge = Bridge::new(SINK);
    let find = command_script(&GuestCommand::Find { query: "example".to_string() }, &bridge, &profile);
    let clear = command_script(&GuestCommand::Find { query: String::new() }, &bridge, &profile);

    driver
        .execute(&find, Vec::<Value>::new())
        .await
        .map_err(|e| format!("Failed to run find: {}", e))?;
    let marks = eval_number(driver, "return document.querySelectorAll('mark[data-pw-find]').length;")
        .await
        .map_err(|e| format!("Failed to count marks: {}", e))?;
    if marks == 0.0 {
        return Err("no matches highlighted".to_string());
    }

    driver
        .execute(&clear, Vec::<Value>::new())
        .await
        .map_err(|e| format!("Failed to clear find: {}", e))?;
    let left = eval_number(driver, "return document.querySelectorAll('mark[data-pw-find]').length;")
        .await
        .map_err(|e| format!("Failed to count marks: {}", e))?;
    if left != 0.0 {
        return Err(format!("{} markers left after clearing", left));
    }
    Ok(())
}

async fn eval_bool(driver: &WebDriver, script: &str) -> WebDriverResult<bool> {
    let result = driver.execute(script, Vec::<Value>::new()).await?;
    Ok(result.json().as_bool().unwrap_or(false))
}

async fn eval_number(driver: &WebDriver, script: &str) -> WebDriverResult<f64> {
    let result = driver.execute(script, Vec::<Value>::new()).await?;
    Ok(result.json().as_f64().unwrap_or(0.0))
}
