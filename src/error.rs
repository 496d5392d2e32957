//! Error types for the cutout pipeline

use thiserror::Error;

/// Result type alias for cutout operations
pub type Result<T> = std::result::Result<T, CutoutError>;

/// Error types for loading, segmentation, and export operations
#[derive(Error, Debug)]
pub enum CutoutError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding errors from the imaging library
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// Background removal requested before any image was loaded
    #[error("no image loaded: load an image before removing its background")]
    NoImageLoaded,

    /// Export requested before background removal produced a result
    #[error("no processed image: run background removal before saving")]
    NoProcessedImage,

    /// Destination extension is not one of the supported export formats
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Encoding to the destination format failed
    #[error("failed to encode {format}: {source}")]
    Encode {
        /// Name of the format being encoded
        format: &'static str,
        /// Underlying encoder error
        #[source]
        source: image::ImageError,
    },

    /// Backend inference errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// Model loading or resolution errors
    #[error("Model error: {0}")]
    Model(String),

    /// Network errors while fetching a model
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Memory allocation or processing errors
    #[error("Processing error: {0}")]
    Processing(String),
}

impl CutoutError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create an encode error carrying the underlying cause
    #[must_use]
    pub fn encode(format: &'static str, source: image::ImageError) -> Self {
        Self::Encode { format, source }
    }

    /// Create a network error with operation context
    pub fn network<S: Into<String>, E: std::fmt::Display>(msg: S, error: E) -> Self {
        Self::Network(format!("{}: {}", msg.into(), error))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {operation} '{path_display}': {error}"),
        ))
    }

    /// Create a configuration error naming the valid range
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {parameter}: {value} (valid range: {valid_range})"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = CutoutError::invalid_config("test config error");
        assert!(matches!(err, CutoutError::InvalidConfig(_)));

        let err = CutoutError::unsupported_format(".gif");
        assert!(matches!(err, CutoutError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CutoutError::invalid_config("quality out of range");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: quality out of range"
        );

        assert!(CutoutError::NoImageLoaded.to_string().contains("no image"));
        assert!(CutoutError::NoProcessedImage
            .to_string()
            .contains("background removal"));
    }

    #[test]
    fn test_file_io_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = CutoutError::file_io_error("read image file", Path::new("/tmp/in.png"), &io_error);
        let rendered = err.to_string();
        assert!(rendered.contains("read image file"));
        assert!(rendered.contains("/tmp/in.png"));
    }

    #[test]
    fn test_config_value_error() {
        let err = CutoutError::config_value_error("quality", 150, "1-100");
        let rendered = err.to_string();
        assert!(rendered.contains("quality"));
        assert!(rendered.contains("150"));
        assert!(rendered.contains("1-100"));
    }

    #[test]
    fn test_encode_error_preserves_cause() {
        let cause = image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "writer closed",
        ));
        let err = CutoutError::encode("JPEG", cause);
        assert!(err.to_string().contains("JPEG"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
