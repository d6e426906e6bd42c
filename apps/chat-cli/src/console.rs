//! Terminal rendering and input parsing.

use std::time::Duration;

use chatlink_connection::ConnectionStatus;

pub const SESSION_EXPIRED_TITLE: &str = "Session Expired";
pub const SESSION_EXPIRED_BODY: &str = "Your session has expired. Please sign in again.";
pub const CONNECTION_FAILED_TITLE: &str = "Server Connection Failed";

pub const HELP: &str = "\
Commands:
  /retry    reconnect now
  /login    sign in (opens the chat channel once a token exists)
  /logout   sign out (falls back to the auth dialogue)
  /status   show connection status
  /quit     exit
Anything else is sent as a chat message.";

/// A line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Retry,
    Login,
    Logout,
    Status,
    Help,
    Quit,
    Unknown(String),
    Empty,
    /// Any line typed while the session-expired notice is up.
    Acknowledge,
}

/// Parses a line. While `awaiting_ack` is set every line except `/quit`
/// acknowledges the session-expired notice.
pub fn parse_input(line: &str, awaiting_ack: bool) -> Input {
    let line = line.trim();
    if awaiting_ack {
        return match line.to_ascii_lowercase().as_str() {
            "/quit" | "/exit" => Input::Quit,
            _ => Input::Acknowledge,
        };
    }
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };
    match command.to_ascii_lowercase().as_str() {
        "retry" => Input::Retry,
        "login" => Input::Login,
        "logout" => Input::Logout,
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

/// One-line status banner.
pub fn status_banner(status: ConnectionStatus, error: Option<&str>) -> String {
    match (status, error) {
        (ConnectionStatus::Connecting, _) => "[Connecting...]".into(),
        (ConnectionStatus::Connected, _) => "[Connected]".into(),
        (ConnectionStatus::Error, Some(error)) => {
            format!("[{CONNECTION_FAILED_TITLE}] {error} (type /retry to reconnect)")
        }
        (ConnectionStatus::Error, None) => format!("[{CONNECTION_FAILED_TITLE}]"),
        (ConnectionStatus::Disconnected, Some(error)) => format!("[Disconnected] {error}"),
        (ConnectionStatus::Disconnected, None) => "[Disconnected]".into(),
    }
}

pub fn transcript_line(message: &str) -> String {
    format!("server> {message}")
}

pub fn reconnecting_line(attempt: u32, delay: Duration) -> String {
    format!(
        "[Reconnecting in {:.1}s, attempt {attempt}]",
        delay.as_secs_f64()
    )
}

/// Blocking notice shown when the server rejects the session.
pub fn session_expired_notice() -> String {
    format!(
        "\n*** {SESSION_EXPIRED_TITLE} ***\n{SESSION_EXPIRED_BODY}\nPress Enter to sign in again.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse_input("  hello there ", false), Input::Message("hello there".into()));
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse_input("/retry", false), Input::Retry);
        assert_eq!(parse_input("/LOGIN", false), Input::Login);
        assert_eq!(parse_input("/logout", false), Input::Logout);
        assert_eq!(parse_input("/status", false), Input::Status);
        assert_eq!(parse_input("/?", false), Input::Help);
        assert_eq!(parse_input("/exit", false), Input::Quit);
    }

    #[test]
    fn unknown_command_and_blank_line() {
        assert_eq!(parse_input("/frobnicate", false), Input::Unknown("/frobnicate".into()));
        assert_eq!(parse_input("   ", false), Input::Empty);
    }

    #[test]
    fn error_banner_carries_description() {
        let banner = status_banner(ConnectionStatus::Error, Some("Failed to connect to chat."));
        assert!(banner.starts_with("[Server Connection Failed]"));
        assert!(banner.contains("Failed to connect to chat."));
    }

    #[test]
    fn connected_banner_ignores_stale_error() {
        assert_eq!(
            status_banner(ConnectionStatus::Connected, Some("old")),
            "[Connected]"
        );
    }

    #[test]
    fn reconnect_line_formats_seconds() {
        assert_eq!(
            reconnecting_line(3, Duration::from_millis(4000)),
            "[Reconnecting in 4.0s, attempt 3]"
        );
    }

    #[test]
    fn expiry_notice_text() {
        let notice = session_expired_notice();
        assert!(notice.contains("Session Expired"));
        assert!(notice.contains("Your session has expired. Please sign in again."));
        assert!(notice.contains("Press Enter"));
    }

    #[test]
    fn expiry_notice_swallows_input_until_acknowledged() {
        assert_eq!(parse_input("", true), Input::Acknowledge);
        assert_eq!(parse_input("hello", true), Input::Acknowledge);
        assert_eq!(parse_input("/logout", true), Input::Acknowledge);
        assert_eq!(parse_input("/QUIT", true), Input::Quit);
    }
}
