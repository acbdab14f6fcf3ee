//! Image upload pipeline.
//!
//! Validates an uploaded image, derives a collision-resistant name, renders a
//! JPEG thumbnail and hands both files to an [`ImageSink`]: the GitHub content
//! repository when configured, else the blob store.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use staffline_core::slugify;
use thiserror::Error;
use tracing::{info, instrument};

use crate::github::{GitHubClient, GitHubError};
use crate::storage::{BlobStore, StorageError};

/// Folders an upload may be filed under.
pub const ALLOWED_FOLDERS: [&str; 5] = ["news", "portfolio", "about", "services", "general"];

/// Folder used when none is given.
pub const DEFAULT_FOLDER: &str = "general";

/// Bounding box of generated thumbnails.
pub const THUMBNAIL_SIZE: u32 = 480;

const THUMBNAIL_QUALITY: u8 = 82;
const MAX_STEM_LENGTH: usize = 60;

/// Errors that reject or abort an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file provided")]
    MissingFile,

    #[error("file is empty")]
    Empty,

    #[error("file exceeds the {max} byte limit")]
    TooLarge { max: usize },

    #[error("unsupported content type {0:?}")]
    UnsupportedType(String),

    #[error("file content does not match its declared type")]
    ContentMismatch,

    #[error("unknown upload folder {0:?}")]
    InvalidFolder(String),

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not encode thumbnail: {0}")]
    Encode(String),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An accepted image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageKind {
    /// Parse a declared MIME type, ignoring parameters and case.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Sniff the format from magic bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::Webp),
            ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }

    /// Canonical MIME type.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    const fn format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Webp => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
        }
    }
}

/// A file received from the upload form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Original file name as sent by the browser.
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File content.
    pub bytes: Vec<u8>,
    /// Requested folder.
    pub folder: Option<String>,
}

/// Result of a successful upload, returned to the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub url: String,
    pub thumbnail_url: String,
    pub path: String,
    pub thumbnail_path: String,
    pub content_type: String,
    pub size: usize,
}

/// Destination of uploaded images.
#[derive(Debug, Clone)]
pub enum ImageSink {
    /// Commit to the GitHub content repository.
    GitHub(GitHubClient),
    /// Write to the blob store.
    Store(BlobStore),
}

impl ImageSink {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError> {
        match self {
            Self::GitHub(client) => {
                let committed = client
                    .put_file(path, &bytes, &format!("Upload {path}"))
                    .await?;
                Ok(committed.url)
            }
            Self::Store(store) => Ok(store.put(path, bytes, content_type).await?),
        }
    }

    /// Short sink name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GitHub(_) => "github",
            Self::Store(_) => "blob-store",
        }
    }
}

/// Image upload service.
#[derive(Debug, Clone)]
pub struct UploadService {
    sink: ImageSink,
    max_bytes: usize,
}

impl UploadService {
    /// Create a service writing to `sink`, accepting files up to `max_bytes`.
    #[must_use]
    pub const fn new(sink: ImageSink, max_bytes: usize) -> Self {
        Self { sink, max_bytes }
    }

    /// Maximum accepted file size in bytes.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// The configured sink.
    #[must_use]
    pub const fn sink(&self) -> &ImageSink {
        &self.sink
    }

    /// Check type, size and magic bytes of an upload.
    ///
    /// # Errors
    ///
    /// Returns the first rule the upload violates.
    pub fn validate(&self, upload: &ImageUpload) -> Result<ImageKind, UploadError> {
        let declared = ImageKind::from_mime(&upload.content_type)
            .ok_or_else(|| UploadError::UnsupportedType(upload.content_type.clone()))?;

        if upload.bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max: self.max_bytes,
            });
        }

        match ImageKind::sniff(&upload.bytes) {
            Some(detected) if detected == declared => Ok(detected),
            _ => Err(UploadError::ContentMismatch),
        }
    }

    /// Validate, thumbnail and store an upload.
    ///
    /// # Errors
    ///
    /// Returns a validation error (client fault) or a sink error (upstream fault).
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.bytes.len(), sink = self.sink.name()))]
    pub async fn upload(&self, upload: ImageUpload) -> Result<UploadResult, UploadError> {
        let kind = self.validate(&upload)?;
        let folder = resolve_folder(upload.folder.as_deref())?;
        let now = Utc::now();

        let name = object_name(folder, &upload.file_name, kind.extension(), now);
        let thumbnail_name = object_name(folder, &upload.file_name, ImageKind::Jpeg.extension(), now);
        let path = format!("images/{name}");
        let thumbnail_path = format!("thumbnails/{thumbnail_name}");

        let bytes = upload.bytes;
        let size = bytes.len();
        let (bytes, thumbnail) = tokio::task::spawn_blocking(move || {
            let thumbnail = make_thumbnail(&bytes, kind);
            (bytes, thumbnail)
        })
        .await
        .map_err(|e| UploadError::Encode(e.to_string()))?;
        let thumbnail = thumbnail?;

        let url = self.sink.put(&path, bytes, kind.mime()).await?;
        let thumbnail_url = self
            .sink
            .put(&thumbnail_path, thumbnail, ImageKind::Jpeg.mime())
            .await?;

        info!(path = %path, "Image uploaded");

        Ok(UploadResult {
            url,
            thumbnail_url,
            path,
            thumbnail_path,
            content_type: kind.mime().to_string(),
            size,
        })
    }
}

/// Resolve the requested folder against the allow-list.
///
/// # Errors
///
/// Returns [`UploadError::InvalidFolder`] for names outside [`ALLOWED_FOLDERS`].
pub fn resolve_folder(folder: Option<&str>) -> Result<&'static str, UploadError> {
    let requested = folder.map(str::trim).filter(|f| !f.is_empty());
    match requested {
        None => Ok(DEFAULT_FOLDER),
        Some(name) => ALLOWED_FOLDERS
            .into_iter()
            .find(|allowed| *allowed == name)
            .ok_or_else(|| UploadError::InvalidFolder(name.to_string())),
    }
}

/// Build `<folder>/<yyyymmdd-hhmmss>-<slug>.<ext>`.
#[must_use]
pub fn object_name(folder: &str, file_name: &str, extension: &str, now: DateTime<Utc>) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem);

    let mut slug = slugify(stem);
    if slug.len() > MAX_STEM_LENGTH {
        slug.truncate(MAX_STEM_LENGTH);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    if slug.is_empty() {
        slug.push_str("image");
    }

    format!("{folder}/{}-{slug}.{extension}", now.format("%Y%m%d-%H%M%S"))
}

/// Render a JPEG thumbnail fitting [`THUMBNAIL_SIZE`], never upscaling.
///
/// # Errors
///
/// Returns [`UploadError::Decode`] if the image cannot be decoded.
pub fn make_thumbnail(bytes: &[u8], kind: ImageKind) -> Result<Vec<u8>, UploadError> {
    let image = image::load_from_memory_with_format(bytes, kind.format())
        .map_err(|e| UploadError::Decode(e.to_string()))?;

    let image = if image.width() > THUMBNAIL_SIZE || image.height() > THUMBNAIL_SIZE {
        image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
    } else {
        image
    };
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

    let mut buffer = Cursor::new(Vec::new());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, THUMBNAIL_QUALITY))
        .map_err(|e| UploadError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use image::{ImageBuffer, Rgb};

    use super::*;
    use crate::storage::LocalBlobStore;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn upload(bytes: Vec<u8>, content_type: &str) -> ImageUpload {
        ImageUpload {
            file_name: "Partitur Seite 1.png".to_string(),
            content_type: content_type.to_string(),
            bytes,
            folder: None,
        }
    }

    fn service(dir: &tempfile::TempDir, max_bytes: usize) -> UploadService {
        let store = BlobStore::Local(LocalBlobStore::new(dir.path().to_path_buf()));
        UploadService::new(ImageSink::Store(store), max_bytes)
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageKind::from_mime("image/PNG"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_mime("image/jpeg; q=1"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("image/svg+xml"), None);
        assert_eq!(ImageKind::from_mime("application/pdf"), None);
    }

    #[test]
    fn test_object_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            object_name("news", "Konzert Plakat.PNG", "png", now),
            "news/20240309-140507-konzert-plakat.png"
        );
        assert_eq!(
            object_name("general", "../../???.jpg", "jpg", now),
            "general/20240309-140507-image.jpg"
        );
        assert_eq!(
            object_name("general", "noextension", "gif", now),
            "general/20240309-140507-noextension.gif"
        );
    }

    #[test]
    fn test_resolve_folder() {
        assert_eq!(resolve_folder(None).unwrap(), "general");
        assert_eq!(resolve_folder(Some(" ")).unwrap(), "general");
        assert_eq!(resolve_folder(Some("portfolio")).unwrap(), "portfolio");
        assert!(matches!(
            resolve_folder(Some("../etc")),
            Err(UploadError::InvalidFolder(_))
        ));
    }

    #[test]
    fn test_validate_rules() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, 1024 * 1024);

        assert!(matches!(
            service.validate(&upload(png(4, 4), "text/plain")),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            service.validate(&upload(Vec::new(), "image/png")),
            Err(UploadError::Empty)
        ));
        assert!(matches!(
            service.validate(&upload(b"not an image at all".to_vec(), "image/png")),
            Err(UploadError::ContentMismatch)
        ));
        assert!(matches!(
            service.validate(&upload(png(4, 4), "image/jpeg")),
            Err(UploadError::ContentMismatch)
        ));
        assert_eq!(
            service.validate(&upload(png(4, 4), "image/png")).unwrap(),
            ImageKind::Png
        );
    }

    #[test]
    fn test_validate_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, 16);
        assert!(matches!(
            service.validate(&upload(png(8, 8), "image/png")),
            Err(UploadError::TooLarge { max: 16 })
        ));
    }

    #[test]
    fn test_thumbnail_fits_bounding_box() {
        let thumbnail = make_thumbnail(&png(1200, 600), ImageKind::Png).unwrap();
        let decoded = image::load_from_memory(&thumbnail).unwrap();
        assert_eq!(image::guess_format(&thumbnail).unwrap(), ImageFormat::Jpeg);
        assert_eq!(decoded.width(), 480);
        assert_eq!(decoded.height(), 240);
    }

    #[test]
    fn test_thumbnail_does_not_upscale() {
        let thumbnail = make_thumbnail(&png(100, 50), ImageKind::Png).unwrap();
        let decoded = image::load_from_memory(&thumbnail).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[tokio::test]
    async fn test_upload_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, 1024 * 1024);
        let mut file = upload(png(640, 640), "image/png");
        file.folder = Some("portfolio".to_string());

        let result = service.upload(file).await.unwrap();
        assert!(result.path.starts_with("images/portfolio/"));
        assert!(result.path.ends_with("-partitur-seite-1.png"));
        assert!(result.thumbnail_path.starts_with("thumbnails/portfolio/"));
        assert!(result.thumbnail_path.ends_with(".jpg"));
        assert_eq!(result.url, format!("/media/{}", result.path));
        assert_eq!(result.content_type, "image/png");

        assert!(dir.path().join(&result.path).exists());
        assert!(dir.path().join(&result.thumbnail_path).exists());
    }
}
