use thiserror::Error;

#[derive(Debug, Error)]
pub enum DossierError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("job not ready: {0}")]
    JobNotReady(String),
    #[error("job {job_id} did not finish after {attempts} polls")]
    JobTimedOut { job_id: String, attempts: u32 },
    /// Carries the generator's message verbatim; it becomes the job or row error text.
    #[error("{0}")]
    Generation(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("invalid batch input: {0}")]
    Input(String),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DossierError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::JobNotFound(_) => "NoSuchJob",
            Self::JobNotReady(_) => "JobNotReady",
            Self::JobTimedOut { .. } => "JobTimedOut",
            Self::Generation(_) => "GenerationFailed",
            Self::Persistence(_) => "PersistenceFailed",
            Self::Input(_) => "InvalidInput",
            Self::Archive(_) => "ArchiveFailed",
            Self::InternalError(_) => "InternalError",
            Self::Io(_) => "InternalError",
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, DossierError>;
