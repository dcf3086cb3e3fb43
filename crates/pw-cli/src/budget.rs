use std::time::Instant;

use pw_compiler::InjectionComposer;
use pw_core::{InjectedScript, RequestGate};

pub struct BudgetOptions {
    pub iterations: usize,
    pub user_domains: usize,
}

const BUDGET_DECIDE_P99_US: f64 = 50.0;
const BUDGET_COMPOSE_COLD_MS: f64 = 20.0;
const BUDGET_COMPOSE_MEMO_US: f64 = 100.0;

const BUDGET_URLS: &[&str] = &[
    "https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js",
    "https://www.google-analytics.com/analytics.js",
    "https://challenges.cloudflare.com/turnstile/v0/api.js",
    "https://example.com/style.css",
    "https://cdn.example.com/image.png",
    "https://api.example.com/data.json",
];

pub fn run_budget(opts: BudgetOptions) -> Result<(), String> {
    if opts.iterations == 0 {
        return Err("Iterations must be positive".to_string());
    }

    println!("Performance Budget Check");
    println!("==================================================");

    let domains: Vec<String> = (0..opts.user_domains)
        .map(|i| format!("tracker{i}.example"))
        .collect();
    let gate = RequestGate::new();

    println!("Warming up...");
    for _ in 0..1000 {
        for url in BUDGET_URLS {
            let _ = gate.check(url, &domains);
        }
    }

    println!("Measuring decide latency ({} user domains)...", domains.len());
    let latencies = measure_decide_latency(&gate, &domains, opts.iterations);
    let p50_us = percentile(&latencies, 0.50);
    let p99_us = percentile(&latencies, 0.99);

    println!("Measuring bundle composition...");
    let selectors: Vec<String> = (0..100).map(|i| format!(".promo-{i}")).collect();
    let no_scripts: [InjectedScript; 0] = [];
    let mut composer = InjectionComposer::default();
    let cold_start = Instant::now();
    let bundle = composer.compose(&selectors, &no_scripts, false);
    let compose_cold_ms = cold_start.elapsed().as_secs_f64() * 1000.0;
    let memo_start = Instant::now();
    let _ = composer.compose(&selectors, &no_scripts, false);
    let compose_memo_us = memo_start.elapsed().as_secs_f64() * 1_000_000.0;

    let mut passed = true;
    println!();
    println!("Results");
    println!("--------------------------------------------------");
    println!("  decide p50: {:.2} μs", p50_us);
    println!("  bundle size: {} bytes", bundle.len());

    passed &= report_budget("Decide P99 Latency", p99_us, BUDGET_DECIDE_P99_US, "μs");
    passed &= report_budget("Compose (cold)", compose_cold_ms, BUDGET_COMPOSE_COLD_MS, "ms");
    passed &= report_budget("Compose (memo hit)", compose_memo_us, BUDGET_COMPOSE_MEMO_US, "μs");

    println!();
    println!("==================================================");

    if passed {
        println!("✓ All performance budgets passed");
        Ok(())
    } else {
        Err("Performance budget exceeded".to_string())
    }
}

fn report_budget(name: &str, actual: f64, limit: f64, unit: &str) -> bool {
    let passed = actual <= limit;
    let status = if passed { "✓" } else { "✗" };
    println!(
        "{} {}: {:.2} {} (limit: {:.2} {})",
        status, name, actual, unit, limit, unit
    );
    passed
}

fn measure_decide_latency(gate: &RequestGate, domains: &[String], iterations: usize) -> Vec<f64> {
    let mut latencies = Vec::with_capacity(iterations * BUDGET_URLS.len());

    for _ in 0..iterations {
        for url in BUDGET_URLS {
            let start = Instant::now();
            let _ = gate.check(url, domains);
            latencies.push(start.elapsed().as_secs_f64() * 1_000_000.0);
        }
    }

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    latencies
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_picks_rank() {
        let data: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&data, 0.99), 99.0);
        assert_eq!(percentile(&data, 0.50), 50.0);
        assert_eq!(percentile(&[], 0.99), 0.0);
    }

    #[test]
    fn zero_iterations_rejected() {
        let err = run_budget(BudgetOptions {
            iterations: 0,
            user_domains: 0,
        });
        assert!(err.is_err());
    }
}
