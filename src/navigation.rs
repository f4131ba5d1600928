//! Navigation resolver: keeps the current location consistent with the session.
//!
//! Redirects always replace the current history entry, so the back button cannot bounce
//! between the login page and a dashboard.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::RoleRevalidation;
use crate::identity::{Session, SessionStatus, SessionStore};
use crate::routes;

/// Location history the resolver drives.
pub trait History: Send + Sync {
    fn location(&self) -> String;
    fn push(&self, path: &str);
    fn replace(&self, path: &str);
}

/// Where the session requires `location` to be replaced with, if anywhere.
///
/// Returns `None` while initializing. Applying the result and resolving again with the
/// same session yields `None`.
pub fn resolve(session: &Session, location: &str) -> Option<&'static str> {
    if session.status() == SessionStatus::Initializing {
        return None;
    }
    if !session.is_authenticated() && routes::is_public(location) {
        return None;
    }
    if !session.acts_signed_in() {
        return Some(routes::LOGIN_PATH);
    }
    let role = session.effective_role();
    let landing = routes::dashboard_path(role);
    if routes::is_public_only(location) {
        return Some(landing);
    }
    if role.is_none() {
        // A role the client cannot map has nowhere to go but the unauthorized page.
        return if routes::normalize_path(location) == routes::UNAUTHORIZED_PATH { None } else { Some(landing) };
    }
    if routes::permits(routes::roles_for(location), role) { None } else { Some(landing) }
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<(Vec<String>, usize)>,
}

impl MemoryHistory {
    pub fn new(start: &str) -> Self {
        MemoryHistory { entries: Mutex::new((vec![start.to_string()], 0)) }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().0.is_empty()
    }

    /// Step back one entry, like the browser back button.
    pub fn back(&self) -> Option<String> {
        let mut g = self.entries.lock();
        if g.1 == 0 {
            return None;
        }
        g.1 -= 1;
        Some(g.0[g.1].clone())
    }
}

impl History for MemoryHistory {
    fn location(&self) -> String {
        let g = self.entries.lock();
        g.0.get(g.1).cloned().unwrap_or_else(|| "/".to_string())
    }

    fn push(&self, path: &str) {
        let mut g = self.entries.lock();
        let next = if g.0.is_empty() { 0 } else { g.1 + 1 };
        g.0.truncate(next);
        g.0.push(path.to_string());
        g.1 = next;
    }

    fn replace(&self, path: &str) {
        let mut g = self.entries.lock();
        if g.0.is_empty() {
            g.0.push(path.to_string());
            g.1 = 0;
        } else {
            let i = g.1;
            g.0[i] = path.to_string();
        }
    }
}

pub struct Navigator {
    store: Arc<SessionStore>,
    history: Arc<dyn History>,
    revalidation: RoleRevalidation,
}

impl Navigator {
    pub fn new(store: Arc<SessionStore>, history: Arc<dyn History>, revalidation: RoleRevalidation) -> Self {
        Navigator { store, history, revalidation }
    }

    pub fn history(&self) -> &Arc<dyn History> {
        &self.history
    }

    /// Apply the resolver to the current location once. Returns the replacement target.
    pub fn sync(&self) -> Option<&'static str> {
        self.apply(&self.store.snapshot())
    }

    fn apply(&self, session: &Session) -> Option<&'static str> {
        let here = self.history.location();
        let target = resolve(session, &here)?;
        info!(target: "navigation", from = %here, to = target, status = ?session.status(), "redirect");
        self.history.replace(target);
        Some(target)
    }

    /// User-initiated navigation: honour a pending credential expiry, optionally
    /// re-validate the role, then go to `path` and resolve. Returns the final location.
    pub async fn navigate(&self, path: &str) -> String {
        if self.store.take_pending_expiry() {
            self.store.expire();
        } else if self.revalidation == RoleRevalidation::OnNavigation && self.store.status() == SessionStatus::Authenticated {
            if let Err(e) = self.store.refresh().await {
                debug!(target: "navigation", kind = %e.kind, "role re-validation failed");
            }
        }
        self.history.push(path);
        self.sync();
        self.history.location()
    }

    /// Sign out and return to the login page, whatever the demo setting.
    pub async fn logout(&self) -> String {
        self.store.logout().await;
        self.history.replace(routes::LOGIN_PATH);
        self.sync();
        self.history.location()
    }

    /// React to every session change until the store is dropped.
    pub async fn run(&self) {
        let mut rx = self.store.subscribe();
        let current = rx.borrow_and_update().clone();
        self.apply(&current);
        while rx.changed().await.is_ok() {
            let session = rx.borrow_and_update().clone();
            self.apply(&session);
        }
        debug!(target: "navigation", "session store closed, navigator stopping");
    }

    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
