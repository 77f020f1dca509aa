use thiserror::Error;

/// Failures of the fetch/decode/join pipeline.
///
/// Any of these aborts the whole pipeline; there is no partial map.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The transport reported a failure. `body` is whatever the server (or
    /// the filesystem) gave back.
    #[error("failed to fetch {resource}: {body}")]
    Network { resource: String, body: String },

    #[error("failed to parse {resource}: {message}")]
    Parse { resource: String, message: String },

    #[error("cannot aggregate an empty dataset")]
    EmptyDataset,

    #[error(transparent)]
    Classification(#[from] ClassifierError),
}

/// A palette/domain pair that cannot classify anything.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("classification.palette must contain at least one color")]
    EmptyPalette,

    #[error("classification.min ({min}) must be below classification.max ({max})")]
    InvalidDomain { min: f64, max: f64 },
}

impl PipelineError {
    pub fn network(resource: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Network {
            resource: resource.into(),
            body: body.into(),
        }
    }

    pub fn parse(resource: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            resource: resource.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
