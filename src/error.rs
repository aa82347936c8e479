pub type OgResult<T> = Result<T, OgError>;

#[derive(thiserror::Error, Debug)]
pub enum OgError {
    #[error("font family '{family}' is unavailable: {reason}")]
    FontUnavailable { family: String, reason: String },

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("failed to decode asset '{id}': {reason}")]
    InvalidAsset { id: String, reason: String },

    #[error("invalid canvas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OgError {
    pub fn font_unavailable(family: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::FontUnavailable {
            family: family.into(),
            reason: reason.to_string(),
        }
    }

    pub fn asset_not_found(id: impl Into<String>) -> Self {
        Self::AssetNotFound(id.into())
    }

    pub fn invalid_asset(id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidAsset {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_asset_not_found(&self) -> bool {
        matches!(self, Self::AssetNotFound(_))
    }
}
