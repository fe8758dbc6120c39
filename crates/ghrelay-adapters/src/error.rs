//! Error types for ghrelay-adapters

use thiserror::Error;

/// Adapter construction and rendering errors
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client could not be built
    #[error("http client error: {0}")]
    Client(String),

    /// Argument template could not be rendered
    #[error("template error: {0}")]
    Template(String),
}

impl From<Error> for ghrelay_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Client(msg) => ghrelay_core::Error::Network(msg),
            Error::Template(msg) => ghrelay_core::Error::InvalidInput(msg),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use ghrelay_core::ErrorCode;

    #[test]
    fn test_template_error_is_validation() {
        let core: ghrelay_core::Error = Error::Template("missing parameter 'number'".into()).into();
        assert_eq!(core.code(), ErrorCode::Validation);
    }
}
