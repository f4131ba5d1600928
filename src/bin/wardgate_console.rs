//!
//! wardgate console
//! ----------------
//! Interactive console over the session core: sign in and out, navigate between
//! screens, and send requests through the session. Configured from environment
//! variables (see `ClientConfig`) and overridable by flags.

use anyhow::{Context, Result};
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use wardgate::cli::{self, Command};
use wardgate::config::{parse_bool, ClientConfig, RoleRevalidation};
use wardgate::identity::{LoginRequest, SessionStore};
use wardgate::navigation::{History, MemoryHistory, Navigator};
use wardgate::transport::HttpTransport;

fn print_usage(program: &str) {
    eprintln!(
        "usage: {} [--url <api base url>] [--timeout-ms <ms>] [--demo [bool]] [--revalidate-role]\n\
         env: WARDGATE_API_URL, WARDGATE_HTTP_TIMEOUT_MS, WARDGATE_DEMO_MODE, WARDGATE_ROLE_REVALIDATE, RUST_LOG",
        program
    );
}

fn apply_args(cfg: &mut ClientConfig, args: &[String], program: &str) -> Result<bool> {
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--url" => {
                let v = args.get(i + 1).context("--url requires a value")?;
                cfg.api_url = v.clone();
                i += 2;
            }
            "--timeout-ms" => {
                let v = args.get(i + 1).context("--timeout-ms requires a value")?;
                let ms: u64 = v.parse().with_context(|| format!("invalid --timeout-ms '{}'", v))?;
                cfg.timeout = Duration::from_millis(ms);
                i += 2;
            }
            "--demo" => {
                // Optional boolean after the flag; bare flag enables.
                match args.get(i + 1).filter(|n| !n.starts_with('-')).and_then(|n| parse_bool(n)) {
                    Some(b) => { cfg.demo_mode = b; i += 2; }
                    None => { cfg.demo_mode = true; i += 1; }
                }
            }
            "--revalidate-role" => { cfg.role_revalidation = RoleRevalidation::OnNavigation; i += 1; }
            "-h" | "--help" => { print_usage(program); return Ok(false); }
            unk => {
                eprintln!("Unrecognized argument: {}", unk);
                print_usage(program);
                std::process::exit(2);
            }
        }
    }
    Ok(true)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    let mut cfg = ClientConfig::from_env()?;
    if !apply_args(&mut cfg, &args, &program)? {
        return Ok(());
    }
    info!(
        target: "wardgate",
        "wardgate console starting: api_url='{}', timeout_ms={}, demo_mode={}, role_revalidation={:?}",
        cfg.api_url, cfg.timeout.as_millis(), cfg.demo_mode, cfg.role_revalidation
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let transport = Arc::new(HttpTransport::new(&cfg)?);
    let store = Arc::new(SessionStore::new(transport, cfg.demo_mode));
    let history = Arc::new(MemoryHistory::new("/"));
    let navigator = Arc::new(Navigator::new(store.clone(), history.clone(), cfg.role_revalidation));
    let _watcher = rt.block_on(async { navigator.clone().spawn() });

    println!("{}", cli::render_location(&store.snapshot(), &history.location()));
    rt.block_on(store.initialize());
    // The watcher may not have run yet; syncing again is a no-op if it has.
    navigator.sync();
    println!("{}", cli::describe_session(&store.snapshot()));
    println!("{}", cli::render_location(&store.snapshot(), &history.location()));
    println!("wardgate console. Type 'help' for commands.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    loop {
        input.clear();
        print!("{}> ", history.location());
        let _ = stdout.flush();
        match stdin.read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let cmd = match cli::parse_command(&input) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(msg) => { eprintln!("{}", msg); continue; }
        };
        match cmd {
            Command::Exit => break,
            Command::Help => println!("{}", cli::HELP),
            Command::Routes => print!("{}", cli::format_routes()),
            Command::WhoAmI => println!("{}", cli::describe_session(&store.snapshot())),
            Command::Login { username, password } => {
                match rt.block_on(store.login(&LoginRequest::new(username, password))) {
                    Ok(user) => println!("welcome, {}", user.name),
                    Err(e) => eprintln!("{}", cli::describe_error(&e)),
                }
                navigator.sync();
            }
            Command::Logout => {
                rt.block_on(navigator.logout());
                println!("signed out");
            }
            Command::Refresh => {
                if let Err(e) = rt.block_on(store.refresh()) {
                    eprintln!("{}", cli::describe_error(&e));
                }
                navigator.sync();
                println!("{}", cli::describe_session(&store.snapshot()));
            }
            Command::Go(path) => {
                rt.block_on(navigator.navigate(&path));
            }
            Command::Back => {
                if history.back().is_none() {
                    println!("no earlier entry");
                }
                navigator.sync();
            }
            Command::Call { method, path, body } => {
                match rt.block_on(store.request(method, &path, body)) {
                    Ok(val) => println!("{}", cli::format_payload(&val)),
                    Err(e) => eprintln!("{}", cli::describe_error(&e)),
                }
                continue;
            }
        }
        println!("{}", cli::render_location(&store.snapshot(), &history.location()));
    }

    Ok(())
}
