pub mod credentials;
pub mod session;

pub use session::{ProfileUpdate, SessionError, SessionSettings, SessionStore};
