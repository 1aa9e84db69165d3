use std::process::ExitCode;

/// Errors that cause deskchat to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("{endpoint} failed{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Backend {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{endpoint} timed out after {timeout_secs}s")]
    Timeout { endpoint: String, timeout_secs: u64 },

    #[error("invalid ticket: {0}")]
    InvalidTicket(String),

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    pub fn backend(endpoint: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        ExitError::Backend {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            ExitError::Config(_) => ExitCode::from(2),
            ExitError::Backend { .. } => ExitCode::from(3),
            ExitError::Timeout { .. } => ExitCode::from(4),
            ExitError::InvalidTicket(_) => ExitCode::from(5),
            ExitError::Other(_) => ExitCode::from(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_includes_status() {
        let err = ExitError::backend("chat proxy", Some(502), "upstream error");
        assert_eq!(err.to_string(), "chat proxy failed (HTTP 502): upstream error");
        let err = ExitError::backend("chat proxy", None, "connection refused");
        assert_eq!(err.to_string(), "chat proxy failed: connection refused");
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            ExitError::Config(String::new()).exit_code(),
            ExitError::backend("x", None, "").exit_code(),
            ExitError::Timeout {
                endpoint: "x".into(),
                timeout_secs: 1,
            }
            .exit_code(),
            ExitError::InvalidTicket(String::new()).exit_code(),
            ExitError::Other(String::new()).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
