pub mod config;
pub mod domain;
pub mod errors;
pub mod messages;

pub use domain::tip::{TipOutcome, TipRequest, TipResponse};
pub use domain::user::{SlackUser, SlackUserId, TeamId};
pub use errors::{ApplicationError, InterfaceError};
pub use messages::{MessageCatalog, MessageError, MessageKey};
