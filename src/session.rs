//! Edit session state
//!
//! One load → remove → export cycle, held as an explicit value instead of
//! mutable globals in a presentation layer. The session owns at most one
//! loaded image and one processed result; both are replaced wholesale, never
//! mutated in place. Because the session is plain data, the export policy can
//! be exercised by tests without any UI attached.

use crate::error::{CutoutError, Result};
use crate::export::{ExportReceipt, ExportRequest};
use crate::processor::BackgroundRemover;
use crate::services::ImageLoader;
use crate::types::CutoutResult;
use image::DynamicImage;
use std::path::Path;

/// State for one load/process/save cycle
#[derive(Default)]
pub struct EditSession {
    original: Option<DynamicImage>,
    processed: Option<CutoutResult>,
}

impl EditSession {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an image from a file path, replacing any previous state
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<&DynamicImage> {
        let image = ImageLoader::load_from_path(path)?;
        Ok(self.load_image(image))
    }

    /// Load an image from encoded bytes, replacing any previous state
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<&DynamicImage> {
        let image = ImageLoader::load_from_bytes(bytes)?;
        Ok(self.load_image(image))
    }

    /// Install an already-decoded image, replacing any previous state
    ///
    /// A stale processed result from an earlier image is dropped so it can
    /// never be exported against the wrong source.
    pub fn load_image(&mut self, image: DynamicImage) -> &DynamicImage {
        self.processed = None;
        self.original.insert(image)
    }

    /// The currently loaded image, if any
    #[must_use]
    pub fn original(&self) -> Option<&DynamicImage> {
        self.original.as_ref()
    }

    /// The current processed result, if background removal has run
    #[must_use]
    pub fn processed(&self) -> Option<&CutoutResult> {
        self.processed.as_ref()
    }

    /// Whether a processed result is available for export
    #[must_use]
    pub fn has_processed(&self) -> bool {
        self.processed.is_some()
    }

    /// Run background removal on the loaded image
    ///
    /// # Errors
    /// [`CutoutError::NoImageLoaded`] when nothing has been loaded yet.
    pub fn remove_background(&mut self, remover: &mut BackgroundRemover) -> Result<&CutoutResult> {
        let image = self.original.as_ref().ok_or(CutoutError::NoImageLoaded)?;
        let result = remover.process(image)?;
        Ok(self.processed.insert(result))
    }

    /// Export the processed result through the export policy
    ///
    /// # Errors
    /// [`CutoutError::NoProcessedImage`] when background removal has not run
    /// for the currently loaded image.
    pub fn export(&self, request: &ExportRequest) -> Result<ExportReceipt> {
        let result = self.processed.as_ref().ok_or(CutoutError::NoProcessedImage)?;
        result.export(request)
    }

    /// Drop all session state
    pub fn reset(&mut self) {
        self.original = None;
        self.processed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use crate::config::RemoverConfig;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn mock_remover() -> BackgroundRemover {
        BackgroundRemover::with_backend(RemoverConfig::default(), Box::new(MockBackend::new()))
    }

    fn red_image(size: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(size, size, Rgb([255, 0, 0])))
    }

    #[test]
    fn test_remove_without_load_is_no_image_loaded() {
        let mut session = EditSession::new();
        let result = session.remove_background(&mut mock_remover());
        assert!(matches!(result, Err(CutoutError::NoImageLoaded)));
    }

    #[test]
    fn test_export_without_processing_is_no_processed_image() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("out.png");

        let mut session = EditSession::new();
        session.load_image(red_image(10));

        let request = ExportRequest::new(&destination, 80).unwrap();
        let result = session.export(&request);

        assert!(matches!(result, Err(CutoutError::NoProcessedImage)));
        assert!(!destination.exists());
    }

    #[test]
    fn test_full_cycle_produces_export() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("out.png");

        let mut session = EditSession::new();
        session.load_image(red_image(64));
        session.remove_background(&mut mock_remover()).unwrap();

        let request = ExportRequest::new(&destination, 80).unwrap();
        let receipt = session.export(&request).unwrap();

        assert!(destination.exists());
        assert!(receipt.bytes_written > 0);
    }

    #[test]
    fn test_reload_drops_stale_processed_result() {
        let mut session = EditSession::new();
        session.load_image(red_image(32));
        session.remove_background(&mut mock_remover()).unwrap();
        assert!(session.has_processed());

        session.load_image(red_image(16));
        assert!(!session.has_processed());
        assert_eq!(session.original().unwrap().width(), 16);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = EditSession::new();
        session.load_image(red_image(8));
        session.reset();
        assert!(session.original().is_none());
        assert!(!session.has_processed());
    }
}
