//! Capture surface: filters user-provided files down to one accepted image.

use crate::types::LocalImage;
use image::ImageFormat;
use std::path::Path;

/// Extensions accepted from file pickers and drops.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

const ACCEPTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// A file offered to the capture surface (one entry of a drop or picker selection).
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub file_name: String,
    /// MIME type declared by the source, if any.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

pub struct CaptureSurface;

impl CaptureSurface {
    /// Accept the first offered file if it is a supported image.
    ///
    /// Anything after the first file is ignored. An unsupported first file
    /// yields `None` without error.
    pub fn accept(files: Vec<CandidateFile>) -> Option<LocalImage> {
        let dropped = files.len().saturating_sub(1);
        let file = files.into_iter().next()?;
        if dropped > 0 {
            tracing::debug!(dropped, "capture: multiple files offered, keeping the first");
        }

        if let Some(mime) = &file.mime {
            if !mime.starts_with("image/") {
                tracing::debug!(file = %file.file_name, mime = %mime, "capture: ignoring non-image file");
                return None;
            }
        }

        let Some(format) = detect_format(&file.file_name, &file.bytes) else {
            tracing::debug!(file = %file.file_name, "capture: ignoring unsupported image type");
            return None;
        };

        tracing::debug!(file = %file.file_name, ?format, bytes = file.bytes.len(), "capture: image accepted");
        Some(LocalImage::new(file.file_name, format, file.bytes))
    }
}

/// Resolve the image format from the file extension, falling back to
/// content sniffing for files without one.
fn detect_format(file_name: &str, bytes: &[u8]) -> Option<ImageFormat> {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
                return None;
            }
            ImageFormat::from_extension(&ext)
        }
        None => image::guess_format(bytes)
            .ok()
            .filter(|format| ACCEPTED_FORMATS.contains(format)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_accepts_each_allowed_extension() {
        for ext in ACCEPTED_EXTENSIONS {
            let file = CandidateFile::new(format!("face.{ext}"), vec![1, 2, 3]);
            assert!(CaptureSurface::accept(vec![file]).is_some(), "rejected .{ext}");
        }
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let image = CaptureSurface::accept(vec![CandidateFile::new("FACE.JPG", vec![1])]).unwrap();
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        assert!(CaptureSurface::accept(vec![CandidateFile::new("face.bmp", vec![1])]).is_none());
        assert!(CaptureSurface::accept(vec![CandidateFile::new("notes.txt", vec![1])]).is_none());
    }

    #[test]
    fn test_rejects_non_image_mime() {
        let file = CandidateFile::new("face.png", vec![1]).with_mime("application/pdf");
        assert!(CaptureSurface::accept(vec![file]).is_none());

        let file = CandidateFile::new("face.png", vec![1]).with_mime("image/png");
        assert!(CaptureSurface::accept(vec![file]).is_some());
    }

    #[test]
    fn test_multi_file_drop_keeps_first() {
        let files = vec![
            CandidateFile::new("first.png", vec![1]),
            CandidateFile::new("second.jpg", vec![2]),
        ];
        let image = CaptureSurface::accept(files).unwrap();
        assert_eq!(image.file_name, "first.png");
        assert_eq!(&*image.bytes, &[1]);
    }

    #[test]
    fn test_unsupported_first_file_is_not_replaced_by_second() {
        let files = vec![
            CandidateFile::new("first.tiff", vec![1]),
            CandidateFile::new("second.jpg", vec![2]),
        ];
        assert!(CaptureSurface::accept(files).is_none());
    }

    #[test]
    fn test_sniffs_content_without_extension() {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let image = CaptureSurface::accept(vec![CandidateFile::new("clipboard", bytes)]).unwrap();
        assert_eq!(image.format, ImageFormat::Png);

        assert!(CaptureSurface::accept(vec![CandidateFile::new("clipboard", vec![0u8; 16])]).is_none());
    }

    #[test]
    fn test_empty_drop() {
        assert!(CaptureSurface::accept(Vec::new()).is_none());
    }
}
