//! Subject photo resolution.
//!
//! Normalizes an opaque photo reference (remote URL, storage path, or
//! absent) into a fixed-size JPEG raster. Every failure mode falls back to
//! a generated placeholder image; resolution never fails the surrounding
//! render.

use image::imageops::FilterType;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use lazy_static::lazy_static;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Normalized photo width in pixels.
pub const PHOTO_WIDTH: u32 = 300;
/// Normalized photo height in pixels.
pub const PHOTO_HEIGHT: u32 = 400;
const JPEG_QUALITY: u8 = 85;

/// Where a photo reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSource {
    Remote,
    Local,
    Absent,
}

/// Provenance of resolved bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFrom {
    Remote,
    Local,
    /// The default placeholder raster.
    Default,
}

/// A resolved, normalized photo ready for embedding.
#[derive(Debug, Clone)]
pub struct ResolvedPhoto {
    pub bytes: Arc<Vec<u8>>,
    pub from: ResolvedFrom,
}

lazy_static! {
    /// Flat light-grey JPEG at the normalized footprint, encoded once.
    static ref DEFAULT_PHOTO: Arc<Vec<u8>> = {
        let canvas = RgbImage::from_pixel(PHOTO_WIDTH, PHOTO_HEIGHT, image::Rgb([209, 213, 219]));
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        encoder
            .encode_image(&DynamicImage::ImageRgb8(canvas))
            .expect("encoding the built-in placeholder cannot fail");
        Arc::new(out)
    };
}

/// Resolves and caches subject photos.
pub struct PhotoResolver {
    client: reqwest::Client,
    cache: Cache<String, Arc<Vec<u8>>>,
    max_source_bytes: usize,
}

impl PhotoResolver {
    pub fn new(max_source_bytes: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache: Cache::builder()
                .max_capacity(256)
                .time_to_live(Duration::from_secs(600))
                .build(),
            max_source_bytes,
        }
    }

    /// Classify a photo reference without touching it.
    pub fn classify(reference: Option<&str>) -> PhotoSource {
        match reference.map(str::trim) {
            None | Some("") => PhotoSource::Absent,
            Some(r) if r.starts_with("http://") || r.starts_with("https://") => PhotoSource::Remote,
            Some(_) => PhotoSource::Local,
        }
    }

    /// The cached default placeholder, used when no usable photo exists.
    pub fn fallback() -> ResolvedPhoto {
        ResolvedPhoto {
            bytes: DEFAULT_PHOTO.clone(),
            from: ResolvedFrom::Default,
        }
    }

    /// Resolve a reference into a normalized raster.
    ///
    /// Guaranteed not to fail: any fetch, decode, size, or format problem
    /// degrades to the default placeholder with a warning.
    pub async fn resolve(&self, reference: &str) -> ResolvedPhoto {
        let source = Self::classify(Some(reference));
        if source == PhotoSource::Absent {
            return Self::fallback();
        }

        if let Some(cached) = self.cache.get(reference).await {
            return ResolvedPhoto {
                bytes: cached,
                from: match source {
                    PhotoSource::Remote => ResolvedFrom::Remote,
                    _ => ResolvedFrom::Local,
                },
            };
        }

        let fetched = match source {
            PhotoSource::Remote => self.fetch_remote(reference).await,
            PhotoSource::Local => self.fetch_local(reference).await,
            PhotoSource::Absent => unreachable!(),
        };

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Photo fetch failed for '{reference}': {e}; using placeholder");
                return Self::fallback();
            }
        };

        match normalize(&raw) {
            Ok(normalized) => {
                let bytes = Arc::new(normalized);
                self.cache.insert(reference.to_string(), bytes.clone()).await;
                ResolvedPhoto {
                    bytes,
                    from: match source {
                        PhotoSource::Remote => ResolvedFrom::Remote,
                        _ => ResolvedFrom::Local,
                    },
                }
            }
            Err(e) => {
                log::warn!("Photo normalize failed for '{reference}': {e}; using placeholder");
                Self::fallback()
            }
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }
        if let Some(length) = response.content_length() {
            if length as usize > self.max_source_bytes {
                return Err(format!("source too large: {length} bytes"));
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| format!("body read failed: {e}"))?;
        if body.len() > self.max_source_bytes {
            return Err(format!("source too large: {} bytes", body.len()));
        }
        Ok(body.to_vec())
    }

    async fn fetch_local(&self, path: &str) -> Result<Vec<u8>, String> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| format!("stat failed: {e}"))?;
        if meta.len() as usize > self.max_source_bytes {
            return Err(format!("source too large: {} bytes", meta.len()));
        }
        tokio::fs::read(path)
            .await
            .map_err(|e| format!("read failed: {e}"))
    }
}

/// Decode, allow-list by decoded format, cover-crop to the fixed
/// footprint, and re-encode as JPEG.
fn normalize(raw: &[u8]) -> Result<Vec<u8>, String> {
    // Format check on decoded metadata, never on a filename extension.
    let format = image::guess_format(raw).map_err(|e| format!("unknown format: {e}"))?;
    if !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP
    ) {
        return Err(format!("format {format:?} not allowed"));
    }

    let decoded = image::load_from_memory(raw).map_err(|e| format!("decode failed: {e}"))?;
    // Cover semantics: crop to fill, never stretch.
    let fitted = decoded.resize_to_fill(PHOTO_WIDTH, PHOTO_HEIGHT, FilterType::Lanczos3);

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode_image(&fitted)
        .map_err(|e| format!("encode failed: {e}"))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let canvas = RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_classify() {
        assert_eq!(PhotoResolver::classify(None), PhotoSource::Absent);
        assert_eq!(PhotoResolver::classify(Some("  ")), PhotoSource::Absent);
        assert_eq!(
            PhotoResolver::classify(Some("https://cdn.example/a.jpg")),
            PhotoSource::Remote
        );
        assert_eq!(
            PhotoResolver::classify(Some("uploads/foto/a.jpg")),
            PhotoSource::Local
        );
    }

    #[test]
    fn test_normalize_covers_fixed_footprint() {
        let wide = png_bytes(800, 200);
        let normalized = normalize(&wide).unwrap();
        let decoded = image::load_from_memory(&normalized).unwrap();
        assert_eq!(decoded.width(), PHOTO_WIDTH);
        assert_eq!(decoded.height(), PHOTO_HEIGHT);
        assert_eq!(image::guess_format(&normalized).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_normalize_rejects_non_image() {
        assert!(normalize(b"this is not an image").is_err());
    }

    #[test]
    fn test_default_photo_is_valid_jpeg() {
        let photo = PhotoResolver::fallback();
        assert_eq!(photo.from, ResolvedFrom::Default);
        let decoded = image::load_from_memory(&photo.bytes).unwrap();
        assert_eq!(decoded.width(), PHOTO_WIDTH);
        assert_eq!(decoded.height(), PHOTO_HEIGHT);
    }

    #[tokio::test]
    async fn test_resolve_missing_local_falls_back() {
        let resolver = PhotoResolver::new(5 * 1024 * 1024);
        let photo = resolver.resolve("does/not/exist.jpg").await;
        assert_eq!(photo.from, ResolvedFrom::Default);
    }

    #[tokio::test]
    async fn test_resolve_corrupt_local_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.jpg");
        std::fs::write(&path, b"junk bytes").unwrap();

        let resolver = PhotoResolver::new(5 * 1024 * 1024);
        let photo = resolver.resolve(path.to_str().unwrap()).await;
        assert_eq!(photo.from, ResolvedFrom::Default);
    }

    #[tokio::test]
    async fn test_resolve_oversized_local_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, png_bytes(64, 64)).unwrap();

        let resolver = PhotoResolver::new(8); // absurdly small cap
        let photo = resolver.resolve(path.to_str().unwrap()).await;
        assert_eq!(photo.from, ResolvedFrom::Default);
    }

    #[tokio::test]
    async fn test_resolve_valid_local_photo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.png");
        std::fs::write(&path, png_bytes(640, 480)).unwrap();

        let resolver = PhotoResolver::new(5 * 1024 * 1024);
        let photo = resolver.resolve(path.to_str().unwrap()).await;
        assert_eq!(photo.from, ResolvedFrom::Local);
        let decoded = image::load_from_memory(&photo.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (PHOTO_WIDTH, PHOTO_HEIGHT));
    }
}
