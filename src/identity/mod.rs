//! Session identity and role-based access control.
//! Keep the public surface thin and split implementation across sub-modules.

mod role;
mod user;
mod session;
mod store;
mod guard;

pub use role::Role;
pub use user::{User, UserPatch, LoginRequest};
pub use session::{Session, SessionStatus, effective_role};
pub use store::{SessionStore, LOGIN_ENDPOINT, LOGOUT_ENDPOINT, PROFILE_ENDPOINT};
pub use guard::{authorize, Decision, Guarded, Rendered};
