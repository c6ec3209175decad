use mf_core::EcsError;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Failures raised while scheduling a world.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// A world operation failed.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// A frame delta that is negative, NaN, or infinite.
    #[error("invalid frame delta: {0}s")]
    InvalidDelta(f64),

    /// A configuration value is out of range.
    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),

    /// The scheduler was stopped and refuses further frames.
    #[error("scheduler is stopped")]
    Stopped,
}
