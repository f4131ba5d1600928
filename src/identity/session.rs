use serde::Serialize;

use super::role::Role;
use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Who is logged in right now.
///
/// Constructed only through the lifecycle constructors below so that `user` is present
/// exactly when the status is `Authenticated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    status: SessionStatus,
    user: Option<User>,
    is_demo_mode: bool,
}

impl Session {
    pub fn initializing(demo_mode: bool) -> Self {
        Session { status: SessionStatus::Initializing, user: None, is_demo_mode: demo_mode }
    }

    /// `demo_mode` is the client-wide switch; a demo account turns it on for this session too.
    pub fn authenticated(user: User, demo_mode: bool) -> Self {
        let is_demo_mode = demo_mode || user.is_demo_account();
        Session { status: SessionStatus::Authenticated, user: Some(user), is_demo_mode }
    }

    pub fn unauthenticated(demo_mode: bool) -> Self {
        Session { status: SessionStatus::Unauthenticated, user: None, is_demo_mode: demo_mode }
    }

    pub fn status(&self) -> SessionStatus { self.status }

    pub fn user(&self) -> Option<&User> { self.user.as_ref() }

    pub fn is_demo_mode(&self) -> bool { self.is_demo_mode }

    pub fn is_authenticated(&self) -> bool { self.status == SessionStatus::Authenticated }

    pub fn effective_role(&self) -> Option<Role> { effective_role(self) }

    /// Unauthenticated demo sessions browse protected screens as the demo role. Public
    /// pages stay reachable for them.
    pub(crate) fn acts_signed_in(&self) -> bool {
        match self.status {
            SessionStatus::Authenticated => true,
            SessionStatus::Unauthenticated => self.is_demo_mode,
            SessionStatus::Initializing => false,
        }
    }

    pub(crate) fn user_mut(&mut self) -> Option<&mut User> { self.user.as_mut() }

    pub(crate) fn recompute_demo(&mut self, demo_mode: bool) {
        if let Some(u) = &self.user {
            self.is_demo_mode = demo_mode || u.is_demo_account();
        }
    }
}

/// Role used for every authorization decision: the demo role for demo sessions,
/// otherwise the user's own role (absent while unresolved).
pub fn effective_role(session: &Session) -> Option<Role> {
    if session.is_demo_mode {
        return Some(Role::GuestDemo);
    }
    session.user.as_ref().and_then(|u| u.role)
}
