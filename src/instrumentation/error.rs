use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("cannot inject lib into nil pod")]
    NilPod,
    #[error("language {0:?} is not supported")]
    UnsupportedLanguage(String),
    #[error("language {0:?} is not implemented yet")]
    NotImplemented(String),
    #[error("init container {container:?} already exists in pod {pod:?}")]
    AlreadyInstrumented { container: String, pod: String },
    #[error("{key} is defined via ValueFrom in container {container:?}")]
    EnvFromSource { key: String, container: String },
}

impl MutationError {
    /// Recognized languages whose mutator does not exist yet.
    pub fn is_pending_support(&self) -> bool {
        matches!(self, MutationError::NotImplemented(_))
    }

    pub fn reason(&self) -> &'static str {
        match self {
            MutationError::NilPod => "nil_pod",
            MutationError::UnsupportedLanguage(_) => "unsupported_language",
            MutationError::NotImplemented(_) => "not_implemented",
            MutationError::AlreadyInstrumented { .. } => "already_instrumented",
            MutationError::EnvFromSource { .. } => "env_from_source",
        }
    }
}
