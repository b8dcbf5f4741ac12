//! Photo-to-sketch transform requests.

use crate::error::ConfigError;
use crate::types::{LocalImage, SketchMethod};

/// User-chosen transform settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformOptions {
    pub method: SketchMethod,
    /// Source photo is blurry; ask the service to deblur first.
    pub deblur: bool,
    pub enhance_gan: bool,
}

impl TransformOptions {
    /// Build options from a method name as typed by the user.
    pub fn parse(method: &str, deblur: bool, enhance_gan: bool) -> Result<Self, ConfigError> {
        Ok(Self {
            method: method.parse()?,
            deblur,
            enhance_gan,
        })
    }
}

/// Body of a remote image-to-sketch call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub image: LocalImage,
    pub method: SketchMethod,
    pub deblur: bool,
    pub enhance_gan: bool,
    pub request_embedding: bool,
}

impl TransformRequest {
    pub fn new(image: LocalImage, options: TransformOptions) -> Self {
        Self {
            image,
            method: options.method,
            deblur: options.deblur,
            enhance_gan: options.enhance_gan,
            request_embedding: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    #[test]
    fn test_parse_rejects_unknown_method() {
        assert_eq!(
            TransformOptions::parse("watercolor", false, false),
            Err(ConfigError::UnknownSketchMethod("watercolor".into()))
        );
    }

    #[test]
    fn test_request_carries_flags() {
        let options = TransformOptions::parse("pencil", true, false).unwrap();
        let image = LocalImage::new("cctv.jpg", ImageFormat::Jpeg, vec![9u8; 3]);
        let request = TransformRequest::new(image.clone(), options);
        assert_eq!(request.method, SketchMethod::Pencil);
        assert!(request.deblur);
        assert!(!request.enhance_gan);
        assert!(request.request_embedding);
        assert_eq!(request.image, image);
    }

    #[test]
    fn test_default_is_adaptive_without_flags() {
        let options = TransformOptions::default();
        assert_eq!(options.method, SketchMethod::Adaptive);
        assert!(!options.deblur && !options.enhance_gan);
    }
}
