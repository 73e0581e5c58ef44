//! The top-level orchestrator.
//!
//! [`Studio`] owns the session, the garment catalog and the ports, and is
//! the only place where session-level failures are caught. Every failure
//! ends up as the session's user-facing error; nothing here panics or
//! propagates a try-on failure to the caller.

use crate::capture::{CAMERA_TARGET, MediaDevices};
use crate::catalog::{Garment, GarmentCatalog, GarmentSource};
use crate::codec::ImageCodec;
use crate::error::{AppError, Result};
use crate::fetch::ResourceFetcher;
use crate::gemini::Composer;
use crate::session::{AppState, TryOnJob, TryOnSession};
use crate::storage::KeyValueStore;
use std::path::{Path, PathBuf};

/// File name used when saving a composed look.
pub const DOWNLOAD_FILE_NAME: &str = "virtual-try-on-look.png";

/// Shown when an uploaded garment cannot be read.
pub const UPLOAD_FAILED: &str = "Could not process the uploaded garment.";

const UPLOAD_MIME_TYPES: &[&str] = &["image/png", "image/jpeg"];

pub struct Studio<F, C, S>
where
    F: ResourceFetcher,
    C: Composer,
    S: KeyValueStore,
{
    session: TryOnSession,
    catalog: GarmentCatalog<S>,
    fetcher: F,
    composer: C,
}

impl<F, C, S> Studio<F, C, S>
where
    F: ResourceFetcher,
    C: Composer,
    S: KeyValueStore,
{
    pub fn new(fetcher: F, composer: C, storage: S) -> Self {
        Self::with_session(fetcher, composer, storage, TryOnSession::new())
    }

    pub fn with_session(fetcher: F, composer: C, storage: S, session: TryOnSession) -> Self {
        Self {
            session,
            catalog: GarmentCatalog::new(storage),
            fetcher,
            composer,
        }
    }

    /// Loads the catalog; a failure degrades to the user garments alone.
    pub async fn load_catalog(&mut self, location: &str) {
        if let Err(e) = self.catalog.load(&self.fetcher, location).await {
            tracing::error!("Could not load garments: {}", e);
            self.session.report(e.user_message());
        }
    }

    /// Opens the camera at the fixed target resolution.
    pub fn attach_camera<D: MediaDevices>(&mut self, devices: &D) {
        self.session.attach_camera(devices.open_camera(CAMERA_TARGET));
    }

    /// Starts a try-on with the catalog garment `id`.
    ///
    /// Returns `false` if the garment is unknown or a try-on is running.
    pub fn select_garment(&mut self, id: i64) -> bool {
        let Some(garment) = self.catalog.get(id) else {
            tracing::warn!(id, "no garment with this id");
            return false;
        };
        let source = garment.src.clone();
        self.session.start(source)
    }

    /// Starts a try-on with an image file chosen by the user.
    ///
    /// When `category` is non-blank the garment is also saved to the
    /// wardrobe. Only PNG and JPEG files are accepted.
    pub async fn upload_garment(&mut self, path: &Path, category: Option<&str>) -> bool {
        if !self.session.state().accepts_selection() {
            return false;
        }

        let encoded = match Self::read_upload(path).await {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!("Upload failed: {}", e);
                self.session.report(UPLOAD_FAILED);
                return false;
            }
        };

        let started = self.session.start(GarmentSource::UserUploaded {
            encoded: encoded.clone(),
        });

        if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.catalog.add(Garment {
                id: chrono::Utc::now().timestamp_millis(),
                name,
                src: GarmentSource::UserUploaded { encoded },
                category: category.to_string(),
            });
        }

        started
    }

    async fn read_upload(path: &Path) -> Result<String> {
        let encoded = ImageCodec::encode_file(path).await?;
        let (mime, _) = ImageCodec::split_encoded(&encoded)?;
        if !UPLOAD_MIME_TYPES.contains(&mime.as_str()) {
            return Err(AppError::encoding(format!("Unsupported garment type: {}", mime)));
        }
        Ok(encoded)
    }

    /// Processes one countdown beat, running the composition on the last.
    ///
    /// Returns immediately unless a countdown is in progress.
    pub async fn step(&mut self) -> AppState {
        if self.session.state() != AppState::Countdown {
            return self.session.state();
        }

        let Some(tick) = self.session.next_tick().await else {
            return self.session.state();
        };

        if let Some(job) = self.session.on_tick(tick) {
            let outcome = self.perform(&job).await;
            self.session.finish(job.epoch, outcome);
        }
        self.session.state()
    }

    /// Steps until the running try-on has a result or was aborted.
    pub async fn run_until_settled(&mut self) -> AppState {
        while self.session.state() == AppState::Countdown {
            self.step().await;
        }
        self.session.state()
    }

    async fn perform(&self, job: &TryOnJob) -> Result<String> {
        let (_, person_payload) = ImageCodec::split_encoded(&job.person)?;

        let (garment_payload, garment_mime) = match &job.garment {
            GarmentSource::UserUploaded { encoded } => {
                let (mime, payload) = ImageCodec::split_encoded(encoded)?;
                (payload, mime)
            }
            GarmentSource::BuiltIn { url } => ImageCodec::fetch_and_encode(&self.fetcher, url).await?,
        };

        self.composer
            .compose(&person_payload, &garment_payload, &garment_mime)
            .await
            .map_err(|e| match e {
                AppError::Composition(_) => e,
                other => AppError::composition(other.to_string()),
            })
    }

    pub fn try_another(&mut self) {
        self.session.try_another();
    }

    pub fn dismiss_error(&mut self) {
        self.session.dismiss_error();
    }

    /// Saves the composed look as `dir/virtual-try-on-look.png`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Encoding`] if there is no result yet or it cannot
    /// be converted to PNG, and [`AppError::Io`] if writing fails.
    pub async fn download(&self, dir: &Path) -> Result<PathBuf> {
        let image = self
            .session
            .generated_image()
            .ok_or_else(|| AppError::encoding("No generated image to download"))?;

        let (_, payload) = ImageCodec::split_encoded(image)?;
        let png = ImageCodec::to_png(&ImageCodec::decode_payload(&payload)?)?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(DOWNLOAD_FILE_NAME);
        tokio::fs::write(&path, png).await?;

        tracing::info!(path = %path.display(), "look saved");
        Ok(path)
    }

    pub fn session(&self) -> &TryOnSession {
        &self.session
    }

    pub fn catalog(&self) -> &GarmentCatalog<S> {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameSource, Resolution, StillFrame};
    use crate::catalog::USER_GARMENTS_KEY;
    use crate::fetch::Resource;
    use crate::storage::MemoryStore;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const CATALOG: &str = "/database/garments.json";

    fn png(color: [u8; 4]) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba(color)))
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[derive(Default)]
    struct MapFetcher(HashMap<String, Resource>);

    impl MapFetcher {
        fn with(mut self, location: &str, bytes: Vec<u8>, content_type: &str) -> Self {
            self.0.insert(
                location.to_string(),
                Resource {
                    bytes,
                    content_type: Some(content_type.to_string()),
                },
            );
            self
        }
    }

    impl ResourceFetcher for MapFetcher {
        async fn fetch(&self, location: &str) -> Result<Resource> {
            self.0
                .get(location)
                .cloned()
                .ok_or_else(|| AppError::fetch(format!("404 {location}")))
        }
    }

    /// Records calls and replies with a fixed PNG or an error.
    struct RecordingComposer {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingComposer {
        fn ok() -> Self {
            Self { calls: Mutex::new(Vec::new()), fail: false }
        }

        fn failing() -> Self {
            Self { calls: Mutex::new(Vec::new()), fail: true }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Composer for RecordingComposer {
        async fn compose(&self, _person: &str, garment: &str, mime: &str) -> Result<String> {
            self.calls.lock().unwrap().push((garment.to_string(), mime.to_string()));
            if self.fail {
                return Err(AppError::composition("service unavailable"));
            }
            let encoded = ImageCodec::to_encoded(&png([0, 255, 0, 255]), None)?;
            Ok(ImageCodec::split_encoded(&encoded)?.1)
        }
    }

    struct Camera(bool);

    impl MediaDevices for Camera {
        fn open_camera(&self, _target: Resolution) -> Result<Box<dyn FrameSource>> {
            if self.0 {
                Ok(Box::new(StillFrame(RgbaImage::from_pixel(32, 18, Rgba([128, 64, 32, 255])))))
            } else {
                Err(AppError::camera("permission denied"))
            }
        }
    }

    fn catalog_json() -> Vec<u8> {
        br#"[
            {"id": 1, "name": "Denim Jacket", "src": "/garments/jacket.png", "category": "Outerwear"},
            {"id": 2, "name": "Ghost Shirt", "src": "/garments/missing.png", "category": "Tops"}
        ]"#
        .to_vec()
    }

    fn fetcher() -> MapFetcher {
        MapFetcher::default()
            .with(CATALOG, catalog_json(), "application/json")
            .with("/garments/jacket.png", png([0, 0, 255, 255]), "image/png")
    }

    async fn studio(composer: RecordingComposer) -> Studio<MapFetcher, RecordingComposer, MemoryStore> {
        let mut studio = Studio::new(fetcher(), composer, MemoryStore::new());
        studio.load_catalog(CATALOG).await;
        studio.attach_camera(&Camera(true));
        studio
    }

    #[tokio::test(start_paused = true)]
    async fn built_in_garment_runs_to_result() {
        let mut studio = studio(RecordingComposer::ok()).await;
        assert!(studio.select_garment(1));
        assert_eq!(studio.session().state(), AppState::Countdown);

        assert_eq!(studio.run_until_settled().await, AppState::Result);
        assert!(studio.session().generated_image().is_some());

        let calls = studio.composer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "image/png");
        assert_eq!(ImageCodec::decode_payload(&calls[0].0).unwrap(), png([0, 0, 255, 255]));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_session_timing_is_honoured() {
        let session = TryOnSession::with_timing(2, std::time::Duration::from_millis(250));
        let mut studio = Studio::with_session(fetcher(), RecordingComposer::ok(), MemoryStore::new(), session);
        studio.load_catalog(CATALOG).await;
        studio.attach_camera(&Camera(true));

        let started = tokio::time::Instant::now();
        assert!(studio.select_garment(1));
        assert_eq!(studio.session().countdown(), Some(2));

        assert_eq!(studio.run_until_settled().await, AppState::Result);
        assert!(started.elapsed() >= std::time::Duration::from_millis(500));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn selection_while_busy_issues_no_call() {
        let mut studio = studio(RecordingComposer::ok()).await;
        assert!(studio.select_garment(1));
        assert!(!studio.select_garment(1));

        studio.run_until_settled().await;
        assert!(!studio.select_garment(1));
        assert_eq!(studio.composer.calls().len(), 1);

        studio.try_another();
        assert!(studio.select_garment(1));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_garment_image_returns_to_live() {
        let mut studio = studio(RecordingComposer::ok()).await;
        assert!(studio.select_garment(2));

        assert_eq!(studio.run_until_settled().await, AppState::Live);
        assert_eq!(
            studio.session().error(),
            Some("Could not generate the image. Please try again.")
        );
        assert_eq!(studio.session().captured_pose(), None);
        assert!(studio.composer.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn composition_failure_returns_to_live() {
        let mut studio = studio(RecordingComposer::failing()).await;
        studio.select_garment(1);
        assert_eq!(studio.run_until_settled().await, AppState::Live);
        assert_eq!(studio.session().captured_pose(), None);
        assert!(studio.session().error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn denied_camera_still_counts_down_then_fails() {
        let mut studio = Studio::new(fetcher(), RecordingComposer::ok(), MemoryStore::new());
        studio.load_catalog(CATALOG).await;
        studio.attach_camera(&Camera(false));
        assert!(studio.session().camera_error().is_some());

        assert!(studio.select_garment(1));
        assert_eq!(studio.run_until_settled().await, AppState::Live);
        assert_eq!(studio.session().error(), Some("The camera components are not ready."));
        assert!(studio.composer.calls().is_empty());
    }

    #[tokio::test]
    async fn catalog_failure_is_reported() {
        let mut studio = Studio::new(MapFetcher::default(), RecordingComposer::ok(), MemoryStore::new());
        studio.load_catalog(CATALOG).await;
        assert_eq!(studio.session().error(), Some("Could not load the virtual wardrobe."));
        assert!(studio.catalog().garments().is_empty());
        assert!(!studio.select_garment(1));
    }

    #[tokio::test(start_paused = true)]
    async fn upload_with_category_is_saved_and_tried_on() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("red-top.png");
        std::fs::write(&path, png([255, 0, 0, 255])).unwrap();

        let mut studio = studio(RecordingComposer::ok()).await;
        assert!(studio.upload_garment(&path, Some("  Tops ")).await);

        let first = &studio.catalog().garments()[0];
        assert_eq!(first.name, "red-top.png");
        assert_eq!(first.category, "Tops");
        assert!(first.src.is_user_uploaded());
        assert!(studio.catalog().storage().get(USER_GARMENTS_KEY).unwrap().is_some());

        assert_eq!(studio.run_until_settled().await, AppState::Result);
        assert_eq!(studio.composer.calls()[0].1, "image/png");
    }

    #[tokio::test(start_paused = true)]
    async fn upload_without_category_is_not_saved() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("top.png");
        std::fs::write(&path, png([255, 0, 0, 255])).unwrap();

        let mut studio = studio(RecordingComposer::ok()).await;
        assert!(studio.upload_garment(&path, Some("   ")).await);
        assert_eq!(studio.catalog().garments().len(), 2);
        assert_eq!(studio.catalog().storage().get(USER_GARMENTS_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_upload_reports_error() {
        let tmp = TempDir::new().unwrap();
        let mut studio = studio(RecordingComposer::ok()).await;

        assert!(!studio.upload_garment(&tmp.path().join("absent.png"), Some("Tops")).await);
        assert_eq!(studio.session().error(), Some(UPLOAD_FAILED));
        assert_eq!(studio.session().state(), AppState::Live);
        assert_eq!(studio.catalog().garments().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn download_writes_png() {
        let tmp = TempDir::new().unwrap();
        let mut studio = studio(RecordingComposer::ok()).await;
        assert!(studio.download(tmp.path()).await.is_err());

        studio.select_garment(1);
        studio.run_until_settled().await;

        let path = studio.download(&tmp.path().join("looks")).await.unwrap();
        assert_eq!(path.file_name().unwrap(), DOWNLOAD_FILE_NAME);
        let bytes = std::fs::read(path).unwrap();
        assert!(matches!(image::guess_format(&bytes), Ok(ImageFormat::Png)));
    }
}
