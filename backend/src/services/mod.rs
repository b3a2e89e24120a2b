pub mod auth;
pub mod session;

pub use auth::{run_to_completion, AuthError, AuthService, LoginInput, LoginOutcome, Registration};
pub use session::{SessionManager, StartedSession};
