//! Setup-layer errors. The per-tick simulation never fails.

/// Errors raised while reading or validating a [`crate::FlockConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse flock config JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("config field `{field}` must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    #[error("config field `{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("flock of {requested} agents exceeds the limit of {limit}")]
    TooMany { requested: usize, limit: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No seed was given and the platform could not supply one.
    #[error("failed to gather entropy for the spawn seed: {0}")]
    Entropy(#[from] getrandom::Error),

    #[error("boundary marker buffer length {0} is not a multiple of 3")]
    MarkerBuffer(usize),
}
