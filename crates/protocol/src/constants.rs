use std::time::Duration;

/// Path of the unauthenticated dialogue channel. Takes no query parameters.
pub const AUTH_DIALOGUE_PATH: &str = "/ws/auth-dialogue";

/// Path of the authenticated chat channel.
pub const CHAT_PATH: &str = "/ws/chat";

/// Query parameter carrying the session token on [`CHAT_PATH`].
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Value of the inbound `error` field signalling that the session token
/// is no longer accepted.
pub const TOKEN_EXPIRED_ERROR: &str = "Token has expired or is invalid";

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close frame without a status code.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Connection dropped without a close frame (never sent on the wire).
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Policy violation. Reserved by the server to mean "token rejected".
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Delay before the first reconnection attempt.
pub const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound for the reconnection delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_millis(30_000);

/// Maximum inbound message size in bytes (1 MB).
pub const WS_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// How often keepalive pings are sent.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(20);

/// Read deadline: if nothing at all arrives within this window the
/// connection is considered dead. Any inbound frame resets it.
pub const WS_PONG_WAIT: Duration = Duration::from_secs(60);

/// Depth of the per-channel outbound queue.
pub const WS_WRITE_QUEUE: usize = 256;

/// Returns `true` if a close code means the server rejected the session
/// token, as opposed to a transient failure.
pub fn is_token_rejection(code: u16) -> bool {
    code == CLOSE_POLICY_VIOLATION
}
