use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

use super::session::{Session, SessionStatus};
use super::user::{LoginRequest, User, UserPatch};
use crate::error::{AppResult, ClassifiedError, ErrorKind};
use crate::transport::{Method, Transport};

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout";
pub const PROFILE_ENDPOINT: &str = "/auth/profile";

struct Inner {
    session: Session,
    /// Ticket of the newest operation whose outcome has been written.
    applied: u64,
    /// Ticket of the newest login whose outcome has been written.
    logged_in: u64,
}

/// How a completion competes with results already written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Write {
    /// Only if no later-started operation has written.
    IfLatest,
    /// Sign-out: yields only to a login that started after it. A profile check racing
    /// the logout cannot keep the user signed in.
    UnlessNewerLogin,
    Always,
}

/// Sole owner and writer of the session.
///
/// Every operation draws a ticket when it starts. A completion only writes if no
/// operation that started later has already written, so a slow stale response (an
/// old profile check resolving after a logout) cannot bring a cleared session back.
/// Logout is the exception: it clears the session unless a later login already landed.
pub struct SessionStore {
    transport: Arc<dyn Transport>,
    demo_mode: bool,
    inner: Mutex<Inner>,
    tx: watch::Sender<Session>,
    tickets: AtomicU64,
    init: OnceCell<()>,
    pending_expiry: AtomicBool,
}

impl SessionStore {
    pub fn new(transport: Arc<dyn Transport>, demo_mode: bool) -> Self {
        Self::build(transport, Session::initializing(demo_mode), demo_mode, false)
    }

    /// Store seeded with a fabricated session; `initialize` becomes a no-op.
    pub fn with_session(transport: Arc<dyn Transport>, session: Session) -> Self {
        let demo = session.is_demo_mode() && !session.user().map(|u| u.is_demo_account()).unwrap_or(false);
        Self::build(transport, session, demo, true)
    }

    fn build(transport: Arc<dyn Transport>, session: Session, demo_mode: bool, initialized: bool) -> Self {
        let (tx, _rx) = watch::channel(session.clone());
        SessionStore {
            transport,
            demo_mode,
            inner: Mutex::new(Inner { session, applied: 0, logged_in: 0 }),
            tx,
            tickets: AtomicU64::new(0),
            init: if initialized { OnceCell::new_with(Some(())) } else { OnceCell::new() },
            pending_expiry: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.inner.lock().session.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.lock().session.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, ticket: u64, write: Write, op: &'static str, next: Session) -> bool {
        let mut inner = self.inner.lock();
        let stale = match write {
            Write::IfLatest => ticket < inner.applied,
            Write::UnlessNewerLogin => ticket < inner.logged_in,
            Write::Always => false,
        };
        if stale {
            debug!(target: "session", op, ticket, applied = inner.applied, "discarding stale result");
            return false;
        }
        if op == "login" {
            inner.logged_in = inner.logged_in.max(ticket);
        }
        inner.applied = inner.applied.max(ticket);
        inner.session = next;
        self.tx.send_replace(inner.session.clone());
        true
    }

    async fn fetch_profile(&self) -> AppResult<User> {
        let payload = self.transport.send(Method::GET, PROFILE_ENDPOINT, None).await?;
        User::from_payload(payload)
    }

    /// Resolve the startup session from an existing credential, at most once per store.
    /// Concurrent callers wait for the same in-flight check.
    pub async fn initialize(&self) {
        self.init.get_or_init(|| self.run_initialize()).await;
    }

    async fn run_initialize(&self) {
        let ticket = self.ticket();
        let completion = InitCompletion { store: self };
        let next = match self.fetch_profile().await {
            Ok(user) => {
                info!(target: "session", user = %user.id, role = ?user.role, "restored existing session");
                Session::authenticated(user, self.demo_mode)
            }
            Err(e) => {
                if e.kind != ErrorKind::AuthExpired {
                    warn!(target: "session", kind = %e.kind, "profile check failed, starting signed out: {}", e.message);
                } else {
                    debug!(target: "session", "no active session");
                }
                Session::unauthenticated(self.demo_mode)
            }
        };
        self.commit(ticket, Write::IfLatest, "initialize", next);
        drop(completion);
    }

    pub async fn login(&self, credentials: &LoginRequest) -> AppResult<User> {
        let ticket = self.ticket();
        let body = serde_json::to_value(credentials)
            .map_err(|e| ClassifiedError::unknown(None, format!("failed to encode credentials: {}", e)))?;
        let user = match self.transport.send(Method::POST, LOGIN_ENDPOINT, Some(body)).await.and_then(User::from_payload) {
            Ok(u) => u,
            Err(e) => {
                info!(target: "session", username = %credentials.username, kind = %e.kind, "login failed");
                return Err(e);
            }
        };
        if self.commit(ticket, Write::IfLatest, "login", Session::authenticated(user.clone(), self.demo_mode)) {
            self.pending_expiry.store(false, Ordering::SeqCst);
            info!(target: "session", user = %user.id, role = ?user.role, "logged in");
        }
        Ok(user)
    }

    /// Best-effort server logout; the local session is cleared whatever the server says,
    /// unless a login that started after this call has already completed.
    pub async fn logout(&self) {
        let ticket = self.ticket();
        if let Err(e) = self.transport.send(Method::POST, LOGOUT_ENDPOINT, None).await {
            warn!(target: "session", kind = %e.kind, "logout request failed, clearing local session anyway: {}", e.message);
        }
        if self.commit(ticket, Write::UnlessNewerLogin, "logout", Session::unauthenticated(self.demo_mode)) {
            self.pending_expiry.store(false, Ordering::SeqCst);
            info!(target: "session", "logged out");
        }
    }

    /// Silent profile re-check. An expired credential signs the user out; other
    /// failures leave the session as it is.
    pub async fn refresh(&self) -> AppResult<()> {
        let ticket = self.ticket();
        match self.fetch_profile().await {
            Ok(user) => {
                self.commit(ticket, Write::IfLatest, "refresh", Session::authenticated(user, self.demo_mode));
                Ok(())
            }
            Err(e) if e.kind == ErrorKind::AuthExpired => {
                self.commit(ticket, Write::IfLatest, "refresh", Session::unauthenticated(self.demo_mode));
                info!(target: "session", "session expired on refresh");
                Err(e)
            }
            Err(e) => {
                warn!(target: "session", kind = %e.kind, "profile refresh failed, keeping session: {}", e.message);
                Err(e)
            }
        }
    }

    /// Merge a server-confirmed partial user. No-op unless authenticated.
    pub fn update_user(&self, patch: UserPatch) {
        let mut inner = self.inner.lock();
        if inner.session.status() != SessionStatus::Authenticated {
            debug!(target: "session", "update_user ignored: not authenticated");
            return;
        }
        if let Some(u) = inner.session.user_mut() {
            u.apply(patch);
        }
        inner.session.recompute_demo(self.demo_mode);
        self.tx.send_replace(inner.session.clone());
    }

    /// Business call through the transport. An expired credential is only recorded here;
    /// the session is cleared on the next guarded navigation, not mid-flight.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> AppResult<Value> {
        let out = self.transport.send(method, path, body).await;
        if let Err(e) = &out {
            if e.kind.forces_logout() && self.status() == SessionStatus::Authenticated {
                self.pending_expiry.store(true, Ordering::SeqCst);
                debug!(target: "session", path, "credential expired, logout deferred to next navigation");
            }
        }
        out
    }

    pub fn has_pending_expiry(&self) -> bool {
        self.pending_expiry.load(Ordering::SeqCst)
    }

    pub(crate) fn take_pending_expiry(&self) -> bool {
        self.pending_expiry.swap(false, Ordering::SeqCst)
    }

    /// Clear the local session after the server reported the credential expired.
    pub fn expire(&self) {
        let ticket = self.ticket();
        self.commit(ticket, Write::Always, "expire", Session::unauthenticated(self.demo_mode));
        info!(target: "session", "session expired, signed out locally");
    }
}

/// Moves the session out of `Initializing` even if the startup check is cancelled or
/// unwinds before writing its result.
struct InitCompletion<'a> {
    store: &'a SessionStore,
}

impl Drop for InitCompletion<'_> {
    fn drop(&mut self) {
        let mut inner = self.store.inner.lock();
        if inner.session.status() == SessionStatus::Initializing {
            inner.session = Session::unauthenticated(self.store.demo_mode);
            self.store.tx.send_replace(inner.session.clone());
        }
    }
}
