pub mod config;
pub mod error;
pub mod kernel;
pub mod services;
pub mod session;
pub mod store;

pub use config::EngineConfig;
pub use error::{IbdmError, Result, Stage};
pub use kernel::domain::{DomainModel, StaticDomain};
pub use kernel::engine::{DialogueMoveEngine, Exchange, TurnOutcome};
pub use kernel::state::InformationState;
pub use session::Session;
pub use store::{FileSessionStore, InMemorySessionStore, SessionRecord, SessionStore};
