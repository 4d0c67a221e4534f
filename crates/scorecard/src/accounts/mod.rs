//! User accounts: signup, login sessions, and administrator user management.

pub mod domain;
mod password;
pub mod router;
pub mod service;
pub mod session;

pub use domain::{LoginRequest, SignupRequest, UserSummary, UserUpdate};
pub use password::{hash_password, verify_password};
pub use router::account_router;
pub use service::{AccountError, AccountService};
pub use session::{bearer_token, Session, SessionError, SessionRegistry};
