use thiserror::Error;

/// Result alias for errors emitted by xpi-lint internals.
pub type XpiResult<T> = Result<T, XpiLintError>;

/// Structured error type for xpi-lint subsystems.
///
/// Hazard findings are never errors; they go to the [`crate::bundle::ErrorBundle`].
/// This type only covers problems reading inputs.
#[derive(Debug, Error)]
pub enum XpiLintError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed ESTree input: {0}")]
    Ast(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl XpiLintError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Convenience macro mirroring `anyhow::bail!` but returning XpiLintError.
#[macro_export]
macro_rules! xpi_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::XpiLintError::other(format!($($arg)*)));
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_maps_to_ast_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: XpiLintError = err.into();
        assert!(matches!(err, XpiLintError::Ast(_)));
        assert!(err.to_string().starts_with("malformed ESTree input"));
    }

    #[test]
    fn bail_macro_returns_other() {
        fn failing() -> XpiResult<()> {
            xpi_bail!("bad target {}", "x");
        }
        let err = failing().unwrap_err();
        assert_eq!(err.to_string(), "bad target x");
    }
}
