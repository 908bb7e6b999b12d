use thiserror::Error;

/// Fatal, user-facing failures. Each one clears the job and sends the tab home.
///
/// Soft conditions (a container missing after partial progress, a field that
/// cannot be read) never surface here; the walkers absorb them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{what} not found")]
    ContainerMissing { what: &'static str },

    #[error("url does not match scraper's current action ({location})")]
    LocationMismatch { location: String },

    #[error("one or more inputs missing for action id 1")]
    MissingInputs,

    #[error("job state names unknown action id {0}")]
    UnknownAction(u8),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("job store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("page error: {0}")]
    Page(#[source] anyhow::Error),
}

impl PipelineError {
    /// Fatal errors clear the job. Store and page failures leave it resumable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::Store(_) | PipelineError::Page(_))
    }

    /// Message shown to the user through the persisted status.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_message_names_the_container() {
        let e = PipelineError::ContainerMissing {
            what: "container for places",
        };
        assert_eq!(e.user_message(), "container for places not found");
    }

    #[test]
    fn infrastructure_errors_are_not_fatal() {
        assert!(PipelineError::MissingInputs.is_fatal());
        assert!(PipelineError::LocationMismatch {
            location: "https://example.org".into()
        }
        .is_fatal());
        assert!(!PipelineError::Store(anyhow::anyhow!("disk")).is_fatal());
        assert!(!PipelineError::Page(anyhow::anyhow!("cdp")).is_fatal());
    }

    #[test]
    fn missing_inputs_message_matches_command_reply() {
        assert_eq!(
            PipelineError::MissingInputs.to_string(),
            "one or more inputs missing for action id 1"
        );
    }
}
