//! Static route table: which roles may view each protected screen, where each role
//! lands after sign-in, and which paths are reachable without a session.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::identity::Role;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Paths an unauthenticated visitor may stay on.
pub const PUBLIC_PATHS: &[&str] = &["/", "/login", "/register"];

/// Paths a signed-in user is always moved away from (including the generic
/// `/dashboard` placeholder).
pub const PUBLIC_ONLY_PATHS: &[&str] = &["/", "/login", "/register", "/dashboard"];

const STAFF: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse, Role::Receptionist, Role::GuestDemo];
const CLINICAL: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse, Role::GuestDemo];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: &'static str,
    /// Empty means any signed-in role.
    pub allowed_roles: &'static [Role],
}

const fn route(path: &'static str, allowed_roles: &'static [Role]) -> RouteDescriptor {
    RouteDescriptor { path, allowed_roles }
}

pub static ROUTES: &[RouteDescriptor] = &[
    route("/dashboard/admin", &[Role::Admin]),
    route("/dashboard/doctor", &[Role::Doctor]),
    route("/dashboard/nurse", &[Role::Nurse]),
    route("/dashboard/receptionist", &[Role::Receptionist]),
    route("/dashboard/demo", &[Role::GuestDemo]),
    route("/patients", STAFF),
    route("/appointments", STAFF),
    route("/clinical-notes", CLINICAL),
    route("/vitals", &[Role::Admin, Role::Doctor, Role::Nurse, Role::GuestDemo]),
    route("/prescriptions", &[Role::Admin, Role::Doctor, Role::GuestDemo]),
    route("/billing", &[Role::Admin, Role::Receptionist, Role::GuestDemo]),
    route("/users", &[Role::Admin]),
    route("/audit-log", &[Role::Admin]),
    route("/settings", &[Role::Admin]),
    route("/profile", &[]),
    route(UNAUTHORIZED_PATH, &[]),
];

/// `ROUTE_ROLES[path]` is the allowed role set of that route.
pub static ROUTE_ROLES: Lazy<HashMap<&'static str, &'static [Role]>> =
    Lazy::new(|| ROUTES.iter().map(|r| (r.path, r.allowed_roles)).collect());

/// Strip query, fragment and trailing slash so `/patients/?page=2` and `/patients` compare equal.
pub fn normalize_path(location: &str) -> &str {
    let end = location.find(|c: char| c == '?' || c == '#').unwrap_or(location.len());
    let path = &location[..end];
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Route governing `location`: exact entry, else the longest entry that is a whole-segment
/// prefix (`/patients/42/notes` is governed by `/patients`).
pub fn route_for(location: &str) -> Option<&'static RouteDescriptor> {
    let path = normalize_path(location);
    ROUTES
        .iter()
        .filter(|r| path == r.path || (path.starts_with(r.path) && path.as_bytes().get(r.path.len()) == Some(&b'/')))
        .max_by_key(|r| r.path.len())
}

/// Allowed roles for a location; unlisted paths are open to any signed-in role.
pub fn roles_for(location: &str) -> &'static [Role] {
    route_for(location).map(|r| r.allowed_roles).unwrap_or(&[])
}

pub fn is_public(location: &str) -> bool {
    PUBLIC_PATHS.contains(&normalize_path(location))
}

pub fn is_public_only(location: &str) -> bool {
    PUBLIC_ONLY_PATHS.contains(&normalize_path(location))
}

pub fn permits(allowed: &[Role], role: Option<Role>) -> bool {
    allowed.is_empty() || role.map(|r| allowed.contains(&r)).unwrap_or(false)
}

/// Landing route after sign-in; a missing role goes to the unauthorized page.
pub fn dashboard_path(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) => "/dashboard/admin",
        Some(Role::Doctor) => "/dashboard/doctor",
        Some(Role::Nurse) => "/dashboard/nurse",
        Some(Role::Receptionist) => "/dashboard/receptionist",
        Some(Role::GuestDemo) => "/dashboard/demo",
        None => UNAUTHORIZED_PATH,
    }
}
