/// Result alias used across the crate.
pub type StageResult<T> = Result<T, StageError>;

/// Error categories surfaced by the stage pipeline.
///
/// Per-layer problems (unresolvable references, failed loads) are recorded in a
/// [`crate::BuildReport`] and never escape a build; they still use these variants so callers can
/// match on the category.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    /// Invalid input or API misuse (for example mounting twice).
    #[error("validation error: {0}")]
    Validation(String),

    /// No concrete URL could be derived for an image reference.
    #[error("asset resolution error: {0}")]
    AssetResolution(String),

    /// A resolved URL could not be fetched or decoded.
    #[error("asset load error: {0}")]
    AssetLoad(String),

    /// A render backend could not be created or mounted.
    #[error("render backend error: {0}")]
    RenderBackend(String),

    /// Scene document (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other error with its source chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    /// Build a [`StageError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StageError::AssetResolution`].
    pub fn asset_resolution(msg: impl Into<String>) -> Self {
        Self::AssetResolution(msg.into())
    }

    /// Build a [`StageError::AssetLoad`].
    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    /// Build a [`StageError::RenderBackend`].
    pub fn render_backend(msg: impl Into<String>) -> Self {
        Self::RenderBackend(msg.into())
    }

    /// Build a [`StageError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
