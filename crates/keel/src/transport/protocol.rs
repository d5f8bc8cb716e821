//! Wire vocabulary of the control plane.
//!
//! Each connection carries exactly one newline-terminated request and one
//! newline-terminated response, both plain ASCII.

/// Health probe request.
pub const PING: &str = "PING";
/// Health probe response.
pub const PONG: &str = "PONG";
/// Shutdown request.
pub const STOP: &str = "STOP";
/// Acknowledgement of [`STOP`].
pub const OK: &str = "OK";
/// Response to a custom command when no handler is registered.
pub const UNKNOWN: &str = "UNKNOWN";

/// Upper bound on a request line, terminator included.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A parsed request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlRequest<'a> {
    Ping,
    Stop,
    Custom(&'a str),
}

impl<'a> ControlRequest<'a> {
    pub(crate) fn parse(line: &'a str) -> Self {
        match line.trim() {
            PING => Self::Ping,
            STOP => Self::Stop,
            other => Self::Custom(other),
        }
    }
}

/// Renders a response as exactly one line.
pub(crate) fn response_line(response: &str) -> String {
    let mut line: String = response
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect();
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::ping("PING", ControlRequest::Ping)]
    #[case::stop("STOP", ControlRequest::Stop)]
    #[case::crlf("STOP\r\n", ControlRequest::Stop)]
    #[case::padded("  PING \n", ControlRequest::Ping)]
    #[case::custom("dialog:{}", ControlRequest::Custom("dialog:{}"))]
    #[case::lowercase("stop", ControlRequest::Custom("stop"))]
    fn parses_requests(#[case] line: &str, #[case] expected: ControlRequest<'_>) {
        assert_eq!(ControlRequest::parse(line), expected);
    }

    #[test]
    fn response_line_flattens_embedded_terminators() {
        assert_eq!(response_line("a\nb\r\nc"), "a b  c\n");
        assert_eq!(response_line(""), "\n");
    }
}
