//! Command parsing and text rendering for the interactive console.

use serde_json::Value;

use crate::error::{ClassifiedError, ErrorKind};
use crate::identity::{Guarded, Rendered, Session, SessionStatus};
use crate::routes;
use crate::transport::Method;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    WhoAmI,
    Go(String),
    Back,
    Call { method: Method, path: String, body: Option<Value> },
    Refresh,
    Routes,
    Help,
    Exit,
}

pub const HELP: &str = "commands:
  login <username> <password>   sign in
  logout                        sign out and return to /login
  whoami                        show the current session
  go <path>                     navigate to a screen (e.g. go /patients)
  back                          previous history entry
  call <METHOD> <path> [json]   send a request through the session
  refresh                       re-check the session with the server
  routes                        list screens and their roles
  help | exit";

/// Parse one console line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() { return Ok(None); }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "login" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(u), Some(p)) => Command::Login { username: u.to_string(), password: p.to_string() },
                _ => return Err("usage: login <username> <password>".into()),
            }
        }
        "logout" => Command::Logout,
        "whoami" | "status" => Command::WhoAmI,
        "go" | "open" => {
            if rest.is_empty() { return Err("usage: go <path>".into()); }
            let path = if rest.starts_with('/') { rest.to_string() } else { format!("/{}", rest) };
            Command::Go(path)
        }
        "back" => Command::Back,
        "call" => {
            let (m, after) = rest.split_once(char::is_whitespace).ok_or("usage: call <METHOD> <path> [json]")?;
            let method = match m.to_ascii_uppercase().as_str() {
                "GET" => Method::GET,
                "POST" => Method::POST,
                "PUT" => Method::PUT,
                "PATCH" => Method::PATCH,
                "DELETE" => Method::DELETE,
                other => return Err(format!("unsupported method: {}", other)),
            };
            let after = after.trim();
            let (path, body) = match after.split_once(char::is_whitespace) {
                Some((p, json)) => {
                    let v: Value = serde_json::from_str(json.trim()).map_err(|e| format!("invalid JSON body: {}", e))?;
                    (p.to_string(), Some(v))
                }
                None => (after.to_string(), None),
            };
            Command::Call { method, path, body }
        }
        "refresh" => Command::Refresh,
        "routes" => Command::Routes,
        "help" | "?" => Command::Help,
        "exit" | "quit" => Command::Exit,
        other => return Err(format!("unknown command '{}'; type 'help'", other)),
    };
    Ok(Some(cmd))
}

pub fn describe_session(session: &Session) -> String {
    let demo = if session.is_demo_mode() { " [demo]" } else { "" };
    match (session.status(), session.user()) {
        (SessionStatus::Initializing, _) => format!("checking session...{}", demo),
        (SessionStatus::Authenticated, Some(u)) => {
            let role = session.effective_role().map(|r| r.to_string()).unwrap_or_else(|| "unresolved".into());
            format!("signed in as {} (id {}, role {}){}", u.name, u.id, role, demo)
        }
        _ => format!("signed out{}", demo),
    }
}

/// What the screen at `location` shows for `session`.
pub fn render_location(session: &Session, location: &str) -> String {
    let path = routes::normalize_path(location);
    if routes::is_public(path) || path == routes::UNAUTHORIZED_PATH {
        return match path {
            "/unauthorized" => "[unauthorized] your account has no role with access to this application".into(),
            "/login" => "[login] sign in with: login <username> <password>".into(),
            "/register" => "[register] account registration".into(),
            _ => "[home] hospital management".into(),
        };
    }
    match Guarded::for_path(path).render(session, || format!("[{}] screen", path.trim_start_matches('/'))) {
        Rendered::Content(s) => s,
        Rendered::Loading => "loading...".into(),
        Rendered::Redirect(to) => format!("redirecting to {}", to),
    }
}

/// Kind-specific message for a failed call.
pub fn describe_error(e: &ClassifiedError) -> String {
    match e.kind {
        ErrorKind::AuthExpired => format!("{} You will be signed out on your next navigation.", e.user_message()),
        ErrorKind::DemoWriteRestricted => format!("notice: {}", e.user_message()),
        ErrorKind::NetworkUnavailable => format!("{} (retry the command)", e.user_message()),
        ErrorKind::Forbidden | ErrorKind::Unknown => format!("error: {}", e.user_message()),
    }
}

pub fn format_routes() -> String {
    let mut out = String::new();
    for r in routes::ROUTES {
        let roles = if r.allowed_roles.is_empty() {
            "any signed-in role".to_string()
        } else {
            r.allowed_roles.iter().map(|x| x.as_str()).collect::<Vec<_>>().join(", ")
        };
        out.push_str(&format!("{:<26} {}\n", r.path, roles));
    }
    out
}

pub fn format_payload(val: &Value) -> String {
    serde_json::to_string_pretty(val).unwrap_or_else(|_| val.to_string())
}
