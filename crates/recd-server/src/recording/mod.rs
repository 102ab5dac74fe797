//! Live recording: per-connection state machines writing to disk.

pub mod error;
pub mod manager;
pub mod output;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use error::RecordingError;
pub use manager::SessionManager;
pub use output::DirectoryStore;
pub use session::{NamingScheme, Outcome, SessionState};
