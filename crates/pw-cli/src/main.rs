//! PageWarden CLI
//!
//! Command-line host driver: admission checks, guest code generation,
//! envelope trace replay and a persisted browsing session.

mod budget;
mod config;
#[cfg(feature = "e2e")]
mod e2e;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use pw_compiler::{command_script, InjectionComposer};
use pw_core::session::NavigationUpdate;
use pw_core::url::display_host;
use pw_core::{
    FileStore, GuestCommand, InjectedScript, KeyValueStore, MemoryStore, SessionStore, TabId,
};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "pw-cli")]
#[command(about = "PageWarden host driver and tools")]
struct Cli {
    /// Config file (overrides the standard search locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether requests would be admitted
    Decide {
        /// Request URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Extra user-blocked domain (repeatable)
        #[arg(short, long = "domain")]
        domains: Vec<String>,

        /// Also apply the blocked domains saved in the session
        #[arg(long)]
        session: bool,
    },

    /// Print the bootstrap bundle
    Compose {
        /// Custom hide selector (repeatable)
        #[arg(short, long = "selector")]
        selectors: Vec<String>,

        /// JSON file with a script list
        #[arg(long)]
        scripts: Option<PathBuf>,

        /// Include the translation widget
        #[arg(long)]
        translate: bool,

        /// Use the saved session's rules and scripts instead
        #[arg(long)]
        session: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the script for one host→guest command given as JSON,
    /// e.g. '{"command":"find","query":"rust"}'
    Command {
        json: String,
    },

    /// Replay a JSONL trace of raw envelopes through the host dispatcher
    Dispatch {
        /// Trace file, one envelope per line
        input: PathBuf,

        /// Accept NETWORK_LOG envelopes
        #[arg(long)]
        capture_network: bool,
    },

    /// Inspect or change the saved session
    Session {
        /// Run without writing tabs or history
        #[arg(long)]
        incognito: bool,

        #[command(subcommand)]
        action: SessionAction,
    },

    /// Check gate and composer latency against budgets
    Budget {
        #[arg(short, long, default_value_t = 2000)]
        iterations: usize,

        /// Number of synthetic user-blocked domains
        #[arg(long, default_value_t = 50)]
        user_domains: usize,
    },

    /// Run a WebDriver end-to-end check (requires the e2e feature)
    #[cfg(feature = "e2e")]
    E2e {
        #[arg(long, default_value = "http://localhost:9515")]
        chromedriver: String,

        #[arg(long, default_value = "https://example.com")]
        url: String,

        #[arg(long)]
        headless: bool,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List tabs, marking the active one with '*'
    Tabs,
    /// Open a tab and make it active
    Open { url: Option<String> },
    /// Close a tab (the last tab is kept)
    Close { id: String },
    /// Switch the active tab
    Select { id: String },
    /// Record a completed navigation in the active tab
    Visit {
        input: String,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Show browsing history, newest first
    History,
    /// Add a custom hide selector
    HideSelector { selector: String },
    /// Add a user-blocked domain
    BlockDomain { domain: String },
    /// Add a user script from a file
    AddScript {
        name: String,
        file: PathBuf,
        #[arg(long, default_value = "*")]
        domain: String,
    },
    /// List user scripts
    Scripts {
        /// Only scripts that would run on this page
        #[arg(long)]
        location: Option<String>,
    },
    /// List builtin and user rules
    Rules,
    /// Flip forced dark mode
    DarkMode,
    /// Save a bookmark
    Bookmark { name: String, url: String },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    let result = match cli.command {
        Commands::Decide {
            urls,
            domains,
            session,
        } => cmd_decide(&config, &urls, domains, session),
        Commands::Compose {
            selectors,
            scripts,
            translate,
            session,
            output,
        } => cmd_compose(&config, selectors, scripts, translate, session, output),
        Commands::Command { json } => cmd_command(&config, &json),
        Commands::Dispatch {
            input,
            capture_network,
        } => cmd_dispatch(&input, capture_network),
        Commands::Session { incognito, action } => cmd_session(&config, incognito, action),
        Commands::Budget {
            iterations,
            user_domains,
        } => budget::run_budget(budget::BudgetOptions {
            iterations,
            user_domains,
        }),
        #[cfg(feature = "e2e")]
        Commands::E2e {
            chromedriver,
            url,
            headless,
        } => e2e::run_e2e(e2e::E2eOptions {
            chromedriver_url: chromedriver,
            page_url: url,
            headless,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn open_session(config: &Config) -> Result<SessionStore<FileStore>, String> {
    SessionStore::open(config.session_path(), config.general.start_page.as_str())
        .map_err(|e| format!("Failed to open session: {}", e))
}

fn cmd_decide(
    config: &Config,
    urls: &[String],
    mut domains: Vec<String>,
    use_session: bool,
) -> Result<(), String> {
    if use_session {
        let session = open_session(config)?;
        domains.extend(session.profile().rules.blocked_domains().map(str::to_string));
    }

    let mut blocked = 0usize;
    for url in urls {
        let decision = pw_core::decide(url, &domains);
        if decision.is_block() {
            blocked += 1;
        }
        println!("{:<5} {}", decision.as_str(), url);
    }
    println!();
    println!("{} of {} blocked", blocked, urls.len());
    Ok(())
}

fn cmd_compose(
    config: &Config,
    selectors: Vec<String>,
    scripts: Option<PathBuf>,
    translate: bool,
    use_session: bool,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let mut composer = InjectionComposer::new(config.bridge(), config.guest_profile());

    let bundle = if use_session {
        let session = open_session(config)?;
        composer.compose_for(&session)
    } else {
        let scripts: Vec<InjectedScript> = match scripts {
            Some(path) => {
                let text = fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
                serde_json::from_str(&text)
                    .map_err(|e| format!("Invalid script list '{}': {}", path.display(), e))?
            }
            None => Vec::new(),
        };
        composer.compose(&selectors, &scripts, translate)
    };

    match output {
        Some(path) => {
            fs::write(&path, bundle.as_bytes())
                .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
            println!("Wrote {} bytes to '{}'", bundle.len(), path.display());
        }
        None => println!("{bundle}"),
    }
    Ok(())
}

fn cmd_command(config: &Config, json: &str) -> Result<(), String> {
    let command: GuestCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command: {}", e))?;
    println!("{}", command_script(&command, &config.bridge(), &config.guest_profile()));
    if let Some(reply) = command.expected_reply() {
        eprintln!("expects reply: {reply}");
    }
    Ok(())
}

fn cmd_dispatch(input: &Path, capture_network: bool) -> Result<(), String> {
    let text = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    let mut session = SessionStore::new(MemoryStore::new());
    if capture_network {
        session.set_network_capture(true);
    }
    let tab = session.active_id().clone();

    let mut applied = 0usize;
    let mut dropped = 0usize;
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match session.handle_message(&tab, line) {
            Some(effect) => {
                applied += 1;
                println!("{:>4}: {:?}", idx + 1, effect);
                if let Some(follow_up) = effect.follow_up() {
                    println!("      follow-up: {:?}", follow_up);
                }
            }
            None => {
                dropped += 1;
                println!("{:>4}: dropped", idx + 1);
            }
        }
    }

    let diag = session.diagnostics();
    println!();
    println!("Applied {} envelope(s), dropped {}", applied, dropped);
    println!("  Console:  {} / {}", diag.console.len(), diag.console.capacity());
    println!("  Network:  {} / {}", diag.network.len(), diag.network.capacity());
    if let Some(count) = diag.find_matches {
        println!("  Find:     {} match(es)", count);
    }
    if let Some(element) = &diag.inspected {
        println!("  Inspected: {}", element.css_selector);
    }
    Ok(())
}

fn cmd_session(config: &Config, incognito: bool, action: SessionAction) -> Result<(), String> {
    let mut session = open_session(config)?;
    session.set_incognito(incognito);

    match action {
        SessionAction::Tabs => print_tabs(&session),
        SessionAction::Open { url } => {
            let url = url.map(|u| session.resolve_input(&u));
            let id = session.add_tab(url.as_deref());
            println!("Opened {}", id);
        }
        SessionAction::Close { id } => {
            if session.close_tab(&TabId::from(id.as_str())) {
                println!("Closed {}", id);
            } else {
                println!("Kept {} (last tab or unknown id)", id);
            }
        }
        SessionAction::Select { id } => {
            session
                .select_tab(&TabId::from(id.as_str()))
                .map_err(|e| e.to_string())?;
            println!("Active: {}", id);
        }
        SessionAction::Visit { input, title } => {
            let url = session.resolve_input(&input);
            let tab = session.active_id().clone();
            session.begin_load(&tab, &url).map_err(|e| e.to_string())?;
            session
                .update_navigation(
                    &tab,
                    NavigationUpdate {
                        url: url.clone(),
                        title,
                        loading: false,
                        can_go_back: true,
                        can_go_forward: false,
                    },
                )
                .map_err(|e| e.to_string())?;
            for command in session.finish_load(&tab).map_err(|e| e.to_string())? {
                println!("run after load: {:?}", command);
            }
            println!("Visited {}", url);
        }
        SessionAction::History => {
            for entry in session.history() {
                let title = match entry.title.as_str() {
                    "" => display_host(&entry.url),
                    title => title,
                };
                println!("{}  {:<30}  {}", entry.date.format("%Y-%m-%d %H:%M"), title, entry.url);
            }
        }
        SessionAction::HideSelector { selector } => match session.add_block_rule(&selector) {
            Some(command) => println!("Added; live command: {:?}", command),
            None => println!("Already present or empty"),
        },
        SessionAction::BlockDomain { domain } => {
            if session.add_blocked_domain(&domain) {
                println!("Blocked {}", domain.trim().to_lowercase());
            } else {
                println!("Already present or empty");
            }
        }
        SessionAction::AddScript { name, file, domain } => {
            let code = fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read '{}': {}", file.display(), e))?;
            let id = session
                .create_script(&name, &domain, &code)
                .map_err(|e| e.to_string())?;
            println!("Added script {}", id);
        }
        SessionAction::Scripts { location } => {
            let scripts = session.profile().scripts.iter().filter(|script| match &location {
                Some(location) => script.applies_to(location),
                None => true,
            });
            for script in scripts {
                let state = if script.active { "on " } else { "off" };
                println!("{} {}  {}  ({})", state, script.id, script.name, script.domain_pattern);
            }
        }
        SessionAction::Rules => {
            let user = session.profile().rules.rules();
            for rule in pw_core::rules::builtin_rules().chain(user) {
                let origin = if rule.builtin { "builtin" } else { "user" };
                println!("{:<7}  {:<16}  {}", origin, format!("{:?}", rule.kind), rule.pattern);
            }
        }
        SessionAction::DarkMode => {
            let command = session.toggle_dark_mode();
            println!("{:?}", command);
        }
        SessionAction::Bookmark { name, url } => {
            let bookmark = session.add_bookmark(&name, &url);
            println!("Saved {} -> {}", bookmark.name, bookmark.url);
        }
    }
    Ok(())
}

fn print_tabs<S: KeyValueStore>(session: &SessionStore<S>) {
    for tab in session.tabs() {
        let marker = if session.is_active(&tab.id) { "*" } else { " " };
        println!("{} {}  {:<30}  {}", marker, tab.id, tab.title, tab.url);
    }
}
