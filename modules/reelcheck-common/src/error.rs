use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelCheckError {
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Media acquisition failed: {0}")]
    Acquisition(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Video analysis failed: {0}")]
    Analysis(String),

    #[error("Claim verification failed: {0}")]
    Verification(String),

    #[error("Narrative generation failed: {0}")]
    Narrative(String),

    #[error("Progress delivery failed: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ReelCheckError {
    /// Whether this failure ends a run. Everything else is absorbed into a
    /// degraded default.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReelCheckError::InvalidLink(_)
                | ReelCheckError::Acquisition(_)
                | ReelCheckError::Analysis(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_link_acquisition_and_analysis_are_fatal() {
        assert!(ReelCheckError::InvalidLink("x".into()).is_fatal());
        assert!(ReelCheckError::Acquisition("x".into()).is_fatal());
        assert!(ReelCheckError::Analysis("x".into()).is_fatal());

        assert!(!ReelCheckError::Transcription("x".into()).is_fatal());
        assert!(!ReelCheckError::Verification("x".into()).is_fatal());
        assert!(!ReelCheckError::Narrative("x".into()).is_fatal());
        assert!(!ReelCheckError::Delivery("x".into()).is_fatal());
        assert!(!ReelCheckError::Config("x".into()).is_fatal());
        assert!(!ReelCheckError::from(anyhow::anyhow!("boom")).is_fatal());
    }

    #[test]
    fn display_names_the_stage() {
        let err = ReelCheckError::Acquisition("timeout".into());
        assert_eq!(err.to_string(), "Media acquisition failed: timeout");
    }
}
