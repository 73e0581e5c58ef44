//! Pose capture.
//!
//! A [`FrameSource`] is the live video surface the mirror preview shows.
//! When the countdown ends, [`capture`] grabs its current frame, flips it
//! horizontally so the still matches the mirrored preview, and encodes it
//! as a JPEG data URL at the frame's native resolution.
//!
//! Cameras are opened through the [`MediaDevices`] port. The terminal host
//! has no live camera, so [`StillImageDevice`] stands in for one by
//! serving a still image from disk as every frame.
//!
//! # Example
//!
//! ```ignore
//! let device = StillImageDevice::new("pose.jpg");
//! let source = device.open_camera(CAMERA_TARGET)?;
//! let pose = capture(Some(source.as_ref()))?;
//! ```

use crate::codec::ImageCodec;
use crate::error::{AppError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage, imageops};
use std::path::PathBuf;

/// JPEG quality used for captured poses.
const CAPTURE_QUALITY: u8 = 92;

/// Requested camera resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Resolution requested when opening the camera.
pub const CAMERA_TARGET: Resolution = Resolution {
    width: 1280,
    height: 720,
};

/// A live video surface.
pub trait FrameSource: Send {
    /// The current frame, or `None` while the surface is not ready.
    fn frame(&self) -> Option<RgbaImage>;
}

/// Port for obtaining camera access.
pub trait MediaDevices {
    /// Opens the camera at the requested resolution.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CameraAccess`] if access is denied or no device
    /// is available.
    fn open_camera(&self, target: Resolution) -> Result<Box<dyn FrameSource>>;
}

/// Captures the current frame of `source` as a mirrored JPEG data URL.
///
/// # Errors
///
/// Returns [`AppError::CaptureUnavailable`] if no source is attached or it
/// has no frame yet, and [`AppError::Encoding`] if JPEG encoding fails.
pub fn capture(source: Option<&dyn FrameSource>) -> Result<String> {
    let frame = source
        .and_then(|s| s.frame())
        .ok_or(AppError::CaptureUnavailable)?;

    if frame.width() == 0 || frame.height() == 0 {
        return Err(AppError::CaptureUnavailable);
    }

    let mirrored = imageops::flip_horizontal(&frame);
    let rgb = DynamicImage::ImageRgba8(mirrored).to_rgb8();

    let mut buffer: Vec<u8> = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, CAPTURE_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| AppError::encoding(format!("Failed to encode capture: {}", e)))?;

    tracing::debug!(width = rgb.width(), height = rgb.height(), "captured pose");
    ImageCodec::to_encoded(&buffer, Some("image/jpeg"))
}

/// A camera whose every frame is the same still image.
#[derive(Debug, Clone)]
pub struct StillImageDevice {
    path: PathBuf,
}

impl StillImageDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MediaDevices for StillImageDevice {
    fn open_camera(&self, target: Resolution) -> Result<Box<dyn FrameSource>> {
        let image = image::open(&self.path).map_err(|e| {
            AppError::camera(format!("Cannot open {}: {}", self.path.display(), e))
        })?;

        if (image.width(), image.height()) != (target.width, target.height) {
            tracing::debug!(
                requested = ?target,
                width = image.width(),
                height = image.height(),
                "camera delivers a different resolution than requested"
            );
        }

        Ok(Box::new(StillFrame(image.to_rgba8())))
    }
}

/// A frame source that always yields the same image.
#[derive(Debug, Clone)]
pub struct StillFrame(pub RgbaImage);

impl FrameSource for StillFrame {
    fn frame(&self) -> Option<RgbaImage> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct NotReady;

    impl FrameSource for NotReady {
        fn frame(&self) -> Option<RgbaImage> {
            None
        }
    }

    fn decode(encoded: &str) -> DynamicImage {
        let (mime, payload) = ImageCodec::split_encoded(encoded).unwrap();
        assert_eq!(mime, "image/jpeg");
        image::load_from_memory(&ImageCodec::decode_payload(&payload).unwrap()).unwrap()
    }

    #[test]
    fn capture_mirrors_at_native_resolution() {
        // Left half black, right half white.
        let frame = RgbaImage::from_fn(64, 32, |x, _| {
            if x < 32 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });

        let still = decode(&capture(Some(&StillFrame(frame))).unwrap()).to_rgb8();
        assert_eq!((still.width(), still.height()), (64, 32));
        assert!(still.get_pixel(4, 16)[0] > 200);
        assert!(still.get_pixel(60, 16)[0] < 50);
    }

    #[test]
    fn missing_surface_is_unavailable() {
        assert!(matches!(capture(None), Err(AppError::CaptureUnavailable)));
        assert!(matches!(capture(Some(&NotReady)), Err(AppError::CaptureUnavailable)));
    }

    #[test]
    fn unreadable_still_is_camera_access_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let device = StillImageDevice::new(tmp.path().join("missing.jpg"));
        assert!(matches!(
            device.open_camera(CAMERA_TARGET),
            Err(AppError::CameraAccess(_))
        ));
    }

    #[test]
    fn still_device_serves_its_image() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pose.png");
        RgbaImage::from_pixel(8, 6, Rgba([1, 2, 3, 255])).save(&path).unwrap();

        let source = StillImageDevice::new(&path).open_camera(CAMERA_TARGET).unwrap();
        let frame = source.frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));
    }
}
