use thiserror::Error;

/// Misuse of the [`crate::TextBufferBuilder`] protocol. A builder that has
/// reported one of these cannot be recovered; start over with a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("builder is already built and no longer accepts chunks")]
    AlreadyBuilt,

    #[error("builder must be built before a buffer can be created")]
    NotBuilt,

    #[error("builder has already created its buffer")]
    AlreadyCreated,
}
