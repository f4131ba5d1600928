use super::role::Role;
use super::session::{Session, SessionStatus};
use crate::routes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Session not settled yet: show a neutral loading state, never redirect.
    WaitForSession,
    RedirectToLogin,
    RedirectToDashboard,
}

/// Decide whether a screen guarded by `route_roles` may render for `session`.
///
/// `Initializing` is checked before `Unauthenticated`, so a user whose profile check is
/// still in flight never sees the login page flash.
pub fn authorize(route_roles: &[Role], session: &Session) -> Decision {
    match session.status() {
        SessionStatus::Initializing => return Decision::WaitForSession,
        SessionStatus::Unauthenticated if !session.is_demo_mode() => return Decision::RedirectToLogin,
        _ => {}
    }
    let Some(role) = session.effective_role() else {
        return Decision::WaitForSession;
    };
    if !route_roles.is_empty() && !route_roles.contains(&role) {
        return Decision::RedirectToDashboard;
    }
    Decision::Allow
}

/// What a guarded screen turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<T> {
    Content(T),
    Loading,
    Redirect(String),
}

/// Wrapper that renders its content only when the guard allows it.
#[derive(Debug, Clone, Copy)]
pub struct Guarded<'a> {
    roles: &'a [Role],
}

impl<'a> Guarded<'a> {
    pub fn new(roles: &'a [Role]) -> Self {
        Guarded { roles }
    }

    pub fn decide(&self, session: &Session) -> Decision {
        authorize(self.roles, session)
    }

    /// `content` runs only on `Allow`. Dashboard redirects land on the effective role's dashboard.
    pub fn render<T, F>(&self, session: &Session, content: F) -> Rendered<T>
    where
        F: FnOnce() -> T,
    {
        match self.decide(session) {
            Decision::Allow => Rendered::Content(content()),
            Decision::WaitForSession => Rendered::Loading,
            Decision::RedirectToLogin => Rendered::Redirect(routes::LOGIN_PATH.to_string()),
            Decision::RedirectToDashboard => Rendered::Redirect(routes::dashboard_path(session.effective_role()).to_string()),
        }
    }
}

impl Guarded<'static> {
    /// Guard for a location using the static route table.
    pub fn for_path(location: &str) -> Self {
        Guarded { roles: routes::roles_for(location) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::User;

    fn signed_in(role: Option<Role>) -> Session {
        Session::authenticated(User { id: "1".into(), name: "u".into(), email: None, role, is_demo: false }, false)
    }

    fn all_sessions() -> Vec<Session> {
        let mut v = vec![
            Session::initializing(false),
            Session::initializing(true),
            Session::unauthenticated(false),
            Session::unauthenticated(true),
            signed_in(None),
        ];
        for r in Role::ALL {
            v.push(signed_in(Some(r)));
        }
        v
    }

    #[test]
    fn allow_iff_authenticated_with_permitted_role_or_open_route() {
        for route in routes::ROUTES {
            for s in all_sessions() {
                let d = authorize(route.allowed_roles, &s);
                let signed_in = s.status() == SessionStatus::Authenticated
                    || (s.status() == SessionStatus::Unauthenticated && s.is_demo_mode());
                let expected = signed_in
                    && s.effective_role().map(|r| route.allowed_roles.is_empty() || route.allowed_roles.contains(&r)).unwrap_or(false);
                assert_eq!(d == Decision::Allow, expected, "route {} session {:?}", route.path, s);
            }
        }
    }

    #[test]
    fn never_redirects_to_login_while_initializing() {
        for route in routes::ROUTES {
            for demo in [false, true] {
                assert_eq!(authorize(route.allowed_roles, &Session::initializing(demo)), Decision::WaitForSession);
            }
        }
    }

    #[test]
    fn receptionist_on_admin_route_goes_to_own_dashboard() {
        let s = signed_in(Some(Role::Receptionist));
        let g = Guarded::for_path("/users");
        assert_eq!(g.decide(&s), Decision::RedirectToDashboard);
        assert_eq!(g.render(&s, || "users"), Rendered::Redirect("/dashboard/receptionist".into()));
    }

    #[test]
    fn unresolved_role_waits() {
        assert_eq!(authorize(&[Role::Doctor], &signed_in(None)), Decision::WaitForSession);
        assert_eq!(authorize(&[], &signed_in(None)), Decision::WaitForSession);
    }

    #[test]
    fn demo_session_acts_as_guest_demo() {
        let s = Session::unauthenticated(true);
        assert_eq!(authorize(&[Role::Admin, Role::GuestDemo], &s), Decision::Allow);
        assert_eq!(authorize(&[Role::Admin], &s), Decision::RedirectToDashboard);
        assert_eq!(Guarded::for_path("/users").render(&s, || ()), Rendered::Redirect("/dashboard/demo".into()));
    }

    #[test]
    fn content_is_not_built_unless_allowed() {
        let mut built = false;
        let r = Guarded::for_path("/patients").render(&Session::unauthenticated(false), || built = true);
        assert_eq!(r, Rendered::Redirect("/login".into()));
        assert!(!built);
    }
}
