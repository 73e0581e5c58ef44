//! Error types for the virtual-mirror-core library.
//!
//! Each variant maps to one failure category of the try-on flow. The
//! session never shows these to the user directly; it collapses them into
//! a fixed sentence per category via [`AppError::user_message`].

use thiserror::Error;

/// Errors that can occur within the virtual-mirror-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The built-in garment catalog could not be fetched or parsed.
    #[error("Catalog load failed: {0}")]
    CatalogLoad(String),

    /// Writing user garments to local storage failed.
    #[error("Failed to persist user garments: {0}")]
    StoragePersist(String),

    /// The camera device could not be opened.
    #[error("Camera access failed: {0}")]
    CameraAccess(String),

    /// No frame surface is attached or ready at capture time.
    #[error("Capture surface is not ready")]
    CaptureUnavailable,

    /// A binary image resource could not be read or encoded.
    #[error("Image encoding failed: {0}")]
    Encoding(String),

    /// An encoded image string lacks the expected media-type tag.
    #[error("Malformed encoded image: {0}")]
    MalformedEncoding(String),

    /// A static resource could not be retrieved.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The remote composition call failed.
    #[error("Composition failed: {0}")]
    Composition(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a catalog load error with the given message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::CatalogLoad(msg.into())
    }

    /// Creates a storage persist error with the given message.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StoragePersist(msg.into())
    }

    /// Creates a camera access error with the given message.
    pub fn camera(msg: impl Into<String>) -> Self {
        Self::CameraAccess(msg.into())
    }

    /// Creates an encoding error with the given message.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Creates a malformed encoding error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEncoding(msg.into())
    }

    /// Creates a fetch error with the given message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Creates a composition error with the given message.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// The single user-facing sentence for this error's category.
    ///
    /// Everything that aborts a try-on after the pose was captured
    /// (encoding, fetching, composing) reads the same to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::CatalogLoad(_) => "Could not load the virtual wardrobe.",
            Self::StoragePersist(_) => "Could not save your garments.",
            Self::CameraAccess(_) => {
                "Camera access denied. Please allow camera permissions and reload."
            }
            Self::CaptureUnavailable => "The camera components are not ready.",
            Self::Encoding(_)
            | Self::MalformedEncoding(_)
            | Self::Fetch(_)
            | Self::Composition(_) => "Could not generate the image. Please try again.",
            Self::Config(_) | Self::Io(_) | Self::Json(_) => "Something went wrong.",
        }
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
