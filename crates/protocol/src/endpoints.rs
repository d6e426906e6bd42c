//! WebSocket endpoint URLs for the two channel roles.

use url::Url;

use crate::constants::{AUTH_DIALOGUE_PATH, CHAT_PATH, TOKEN_QUERY_PARAM};
use crate::error::ProtocolError;

/// Validated WebSocket base URL with the derived channel endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
    auth: Url,
    chat: Url,
}

impl Endpoints {
    /// Parses a `ws://` or `wss://` base URL.
    ///
    /// A trailing slash is ignored and any path prefix is kept, so
    /// `wss://host/api/` yields `wss://host/api/ws/chat`.
    pub fn new(base: &str) -> Result<Self, ProtocolError> {
        let base = Url::parse(base.trim())?;
        match base.scheme() {
            "ws" | "wss" => {}
            other => return Err(ProtocolError::UnsupportedScheme(other.to_string())),
        }

        let auth = with_path(&base, AUTH_DIALOGUE_PATH);
        let chat = with_path(&base, CHAT_PATH);
        Ok(Self { base, auth, chat })
    }

    /// The configured base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `<base>/ws/auth-dialogue`.
    pub fn auth_url(&self) -> Url {
        self.auth.clone()
    }

    /// `<base>/ws/chat?token=<token>`.
    pub fn chat_url(&self, token: &str) -> Url {
        let mut url = self.chat.clone();
        url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, token);
        url
    }
}

fn with_path(base: &Url, suffix: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}{suffix}"));
    url.set_query(None);
    url.set_fragment(None);
    url
}
