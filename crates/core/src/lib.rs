//! Virtual Mirror Core Library
//!
//! This library provides the core functionality of the virtual try-on
//! studio: pose capture, the garment wardrobe, image encoding and the
//! Gemini-backed composition of a garment onto the captured pose.
//!
//! # Overview
//!
//! A try-on runs through a small state machine:
//!
//! - **Live**: the mirror preview waits for a garment
//! - **Countdown**: 3, 2, 1, then the current camera frame is captured
//! - **Loading**: the pose and the garment are sent to Gemini
//! - **Result**: the composed look is shown until the user tries another
//!
//! # Quick Start
//!
//! The simplest way to use the library is through [`Studio::from_config`]:
//!
//! ```ignore
//! use virtual_mirror_core::{Config, FileStore, StillImageDevice, Studio};
//!
//! let config = Config::load()?;
//! let mut studio = Studio::from_config(&config, FileStore::in_data_dir()?)?;
//! studio.load_catalog(&config.catalog_location).await;
//! studio.attach_camera(&StillImageDevice::new("pose.jpg"));
//!
//! if studio.select_garment(1) {
//!     studio.run_until_settled().await;
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`capture`]: Camera ports and frame capture
//! - [`catalog`]: Garment records and the merged wardrobe
//! - [`codec`]: Data-URL image encoding
//! - [`config`]: Configuration loading
//! - [`error`]: Error types and result aliases
//! - [`fetch`]: Static resource retrieval
//! - [`gemini`]: Composition through the Gemini API
//! - [`session`]: The try-on state machine
//! - [`storage`]: Local key-value persistence
//! - [`studio`]: The orchestrator tying it all together

pub mod capture;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gemini;
pub mod session;
pub mod storage;
pub mod studio;

// Re-export primary types for convenience
pub use capture::{MediaDevices, StillImageDevice};
pub use catalog::{Garment, GarmentCatalog, GarmentSource};
pub use codec::ImageCodec;
pub use config::Config;
pub use error::{AppError, Result};
pub use fetch::AssetRoot;
pub use gemini::GeminiComposer;
pub use session::{AppState, TryOnSession};
pub use storage::FileStore;
pub use studio::Studio;

impl Studio<AssetRoot, GeminiComposer, FileStore> {
    /// Builds a studio from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the Gemini client cannot be created
    /// (e.g. no API key is configured).
    pub fn from_config(config: &Config, storage: FileStore) -> Result<Self> {
        let composer = GeminiComposer::new(config)?;
        Ok(Self::new(AssetRoot::new(&config.asset_root), composer, storage))
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
/// This loads `.env` files if present.
pub fn init() {
    let _ = dotenvy::dotenv();
}
