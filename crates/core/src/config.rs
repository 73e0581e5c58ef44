use std::env;
use std::path::PathBuf;
use crate::error::{AppError, Result};
use dotenvy::dotenv;

/// Model used when `GEMINI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Location of the built-in catalog beneath the asset root.
pub const DEFAULT_CATALOG: &str = "/database/garments.json";

#[derive(Clone, Debug)]
pub struct Config {
    /// Empty when unset; only the Gemini client requires it.
    pub gemini_api_key: String,
    pub model_name: String,
    pub asset_root: PathBuf,
    pub catalog_location: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let api_key = env::var("GEMINI_API_KEY").unwrap_or_default();

        let model_name = env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let asset_root = env::var("MIRROR_ASSET_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let catalog_location = env::var("MIRROR_CATALOG")
            .unwrap_or_else(|_| DEFAULT_CATALOG.to_string());

        if catalog_location.trim().is_empty() {
            return Err(AppError::config("MIRROR_CATALOG must not be empty"));
        }

        Ok(Self {
            gemini_api_key: api_key,
            model_name,
            asset_root,
            catalog_location,
        })
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    model: Option<String>,
    asset_root: Option<PathBuf>,
    catalog: Option<String>,
}

impl ConfigBuilder {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    pub fn with_catalog(mut self, location: impl Into<String>) -> Self {
        self.catalog = Some(location.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        let model_name = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model_name.trim().is_empty() {
            return Err(AppError::config("Model name must not be empty"));
        }

        Ok(Config {
            gemini_api_key: self.api_key.unwrap_or_default(),
            model_name,
            asset_root: self.asset_root.unwrap_or_else(|| PathBuf::from(".")),
            catalog_location: self.catalog.unwrap_or_else(|| DEFAULT_CATALOG.to_string()),
        })
    }
}
