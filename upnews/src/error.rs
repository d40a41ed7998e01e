use thiserror::Error;

pub use common::ConfigError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An audit record could not be written. The classification it describes stands.
#[derive(Error, Debug)]
pub enum AuditWriteError {
    #[error("failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write audit log: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of an external collaborator, scoped to one unit of work.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("news source '{source_name}' failed: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: BoxError,
    },
    #[error("persistence store failed: {0}")]
    Persistence(#[source] BoxError),
    #[error("content generation failed: {0}")]
    Generation(#[source] BoxError),
}

impl CollaboratorError {
    pub fn fetch(source_name: impl Into<String>, error: anyhow::Error) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            error: error.into(),
        }
    }

    pub fn persistence(error: anyhow::Error) -> Self {
        Self::Persistence(error.into())
    }

    pub fn generation(error: anyhow::Error) -> Self {
        Self::Generation(error.into())
    }
}

/// Errors that abort a whole pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}
