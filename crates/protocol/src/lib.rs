pub mod constants;
pub mod endpoints;
pub mod error;
pub mod frames;

// Re-export primary types for convenience.
pub use constants::is_token_rejection;
pub use endpoints::Endpoints;
pub use error::ProtocolError;
pub use frames::{InboundFrame, OutboundFrame};
