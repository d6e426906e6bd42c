//! Resilient session connection manager.
//!
//! Drives an unauthenticated auth-dialogue channel and an authenticated
//! chat channel over WebSocket, relays issued and rotated tokens through a
//! pluggable token store, and reconnects with exponential backoff.

pub mod channel;
mod driver;
pub(crate) mod machine;
pub mod manager;
pub(crate) mod pumps;
pub(crate) mod reconnection;
pub(crate) mod relay;
#[cfg(test)]
mod testing;
pub mod token_store;
pub mod types;
pub mod ws_client;

pub use channel::{Channel, ChannelError, ChannelEvents, ChannelId, Connector};
pub use manager::{ConnectionManager, SessionError};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};
pub use types::{
    ChannelRole, ChannelSnapshot, ChannelState, ConnectionEvent, ConnectionStatus,
    ReconnectConfig, SessionConfig,
};
pub use ws_client::{WsChannel, WsConnector};
