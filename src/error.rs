use std::process::ExitCode;

use crate::assets::AssetError;
use crate::store::StoreError;

/// A request was incomplete. Nothing was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a trigger is required")]
    MissingTrigger,
    #[error("response content is required")]
    MissingContent,
    #[error("a positive respondent id is required")]
    MissingId,
}

/// Failures of respondent operations.
#[derive(Debug, thiserror::Error)]
pub enum RespondentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("respondent #{id} not found")]
    NotFound { id: u64 },

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Assets(#[from] AssetError),

    #[error("respondent store failed: {0}")]
    Store(#[from] StoreError),
}

/// Errors that cause dynres to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Store(String),

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    /// Pair a respondent failure with the user-facing text rendered for it.
    pub fn from_respondent(err: &RespondentError, message: String) -> Self {
        match err {
            RespondentError::Validation(_) => Self::Invalid(message),
            RespondentError::NotFound { .. } => Self::NotFound(message),
            RespondentError::Forbidden => Self::Forbidden(message),
            RespondentError::Store(_) => Self::Store(message),
            RespondentError::Assets(_) => Self::Other(message),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::from(2),
            Self::Invalid(_) => ExitCode::from(3),
            Self::NotFound(_) => ExitCode::from(4),
            Self::Forbidden(_) => ExitCode::from(5),
            Self::Store(_) => ExitCode::from(6),
            Self::Other(_) => ExitCode::from(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respondent_errors_map_to_exit_errors() {
        let not_found = RespondentError::NotFound { id: 4 };
        assert!(matches!(
            ExitError::from_respondent(&not_found, "gone".into()),
            ExitError::NotFound(m) if m == "gone"
        ));
        assert!(matches!(
            ExitError::from_respondent(&ValidationError::MissingId.into(), String::new()),
            ExitError::Invalid(_)
        ));
        assert!(matches!(
            ExitError::from_respondent(&RespondentError::Forbidden, String::new()),
            ExitError::Forbidden(_)
        ));
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            RespondentError::NotFound { id: 12 }.to_string(),
            "respondent #12 not found"
        );
        assert_eq!(
            RespondentError::from(ValidationError::MissingTrigger).to_string(),
            "a trigger is required"
        );
    }
}
