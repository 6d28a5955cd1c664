use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

pub const MAX_PHOTO_DIMENSION: u32 = 1200;
pub const PHOTO_JPEG_QUALITY: u8 = 80;

/// A compressed photo ready for preview and PDF embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Photo {
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", B64.encode(&self.jpeg))
    }
}

/// A file handed over by the host's file picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    #[serde(default)]
    pub name: Option<String>,
    pub mime: String,
    /// Base64 payload, optionally with a `data:` URL prefix.
    pub data: String,
}

/// Target size keeping the aspect ratio, longer side capped at `max_side`.
pub fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_side || longer == 0 {
        return (width, height);
    }
    let scale = max_side as f64 / longer as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

pub fn decode_base64_payload(data: &str) -> Result<Vec<u8>, String> {
    let payload = match data.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => data,
    };
    B64.decode(payload.trim().as_bytes())
        .map_err(|e| format!("base64_decode_failed:{e}"))
}

/// Decode any supported image, shrink it to the photo limit and re-encode
/// as JPEG.
pub fn compress_image(bytes: &[u8]) -> Result<Photo, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("photo_decode_failed:{e}"))?;
    let (src_w, src_h) = img.dimensions();
    let (w, h) = fit_within(src_w, src_h, MAX_PHOTO_DIMENSION);
    let resized: DynamicImage = if (w, h) == (src_w, src_h) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Triangle)
    };
    let rgb = resized.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, PHOTO_JPEG_QUALITY)
        .encode(rgb.as_raw(), w, h, ColorType::Rgb8)
        .map_err(|e| format!("photo_encode_failed:{e}"))?;
    Ok(Photo {
        jpeg,
        width: w,
        height: h,
    })
}

/// Ordered list of attached photos.
#[derive(Debug, Clone, Default)]
pub struct PhotoAlbum {
    photos: Vec<Photo>,
}

impl PhotoAlbum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn push(&mut self, photo: Photo) {
        self.photos.push(photo);
    }

    /// Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<Photo> {
        (index < self.photos.len()).then(|| self.photos.remove(index))
    }

    pub fn clear(&mut self) {
        self.photos.clear();
    }

    /// Compress and append every image upload. Non-image files are skipped;
    /// the first failure is reported after the remaining files are handled.
    pub fn add_uploads(&mut self, files: &[UploadedFile]) -> Result<usize, String> {
        let mut added = 0;
        let mut first_error = None;
        for file in files {
            if !file.mime.starts_with("image/") {
                tracing::debug!(mime = %file.mime, "skipping non-image upload");
                continue;
            }
            match decode_base64_payload(&file.data).and_then(|bytes| compress_image(&bytes)) {
                Ok(photo) => {
                    self.photos.push(photo);
                    added += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, name = ?file.name, "photo upload rejected");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(added),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn upload(mime: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            name: None,
            mime: mime.into(),
            data: format!("data:{mime};base64,{}", B64.encode(bytes)),
        }
    }

    fn tiny_photo(tag: u8) -> Photo {
        Photo {
            jpeg: vec![tag],
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn fit_within_preserves_aspect() {
        assert_eq!(fit_within(4000, 3000, 1200), (1200, 900));
        assert_eq!(fit_within(3000, 4000, 1200), (900, 1200));
        assert_eq!(fit_within(800, 600, 1200), (800, 600));
        assert_eq!(fit_within(5000, 1, 1200), (1200, 1));
    }

    #[test]
    fn oversized_upload_is_shrunk_to_limit() {
        let photo = compress_image(&png_bytes(4000, 3000)).expect("compress");
        assert!(photo.width <= MAX_PHOTO_DIMENSION);
        assert_eq!((photo.width, photo.height), (1200, 900));
        let decoded = image::load_from_memory(&photo.jpeg).expect("jpeg decodes");
        assert_eq!(decoded.dimensions(), (1200, 900));
        assert!(photo.data_url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn small_upload_keeps_size() {
        let photo = compress_image(&png_bytes(320, 200)).expect("compress");
        assert_eq!((photo.width, photo.height), (320, 200));
    }

    #[test]
    fn add_uploads_skips_non_images() {
        let mut album = PhotoAlbum::new();
        let files = vec![
            upload("image/png", &png_bytes(20, 10)),
            upload("application/pdf", b"%PDF-1.4"),
        ];
        assert_eq!(album.add_uploads(&files), Ok(1));
        assert_eq!(album.len(), 1);
    }

    #[test]
    fn broken_image_is_reported_but_others_are_kept() {
        let mut album = PhotoAlbum::new();
        let files = vec![
            upload("image/jpeg", b"not really a jpeg"),
            upload("image/png", &png_bytes(20, 10)),
        ];
        let err = album.add_uploads(&files).unwrap_err();
        assert!(err.starts_with("photo_decode_failed"), "{err}");
        assert_eq!(album.len(), 1);
    }

    #[test]
    fn remove_shifts_later_photos_down() {
        let mut album = PhotoAlbum::new();
        for tag in 0..4 {
            album.push(tiny_photo(tag));
        }
        let removed = album.remove(1).expect("removed");
        assert_eq!(removed.jpeg, vec![1]);
        assert_eq!(album.len(), 3);
        let tags: Vec<u8> = album.photos().iter().map(|p| p.jpeg[0]).collect();
        assert_eq!(tags, vec![0, 2, 3]);
    }

    #[test]
    fn remove_out_of_range_is_a_no_op() {
        let mut album = PhotoAlbum::new();
        assert!(album.remove(0).is_none());
        album.push(tiny_photo(9));
        assert!(album.remove(5).is_none());
        assert_eq!(album.len(), 1);
    }

    #[test]
    fn plain_base64_payload_is_accepted() {
        let bytes = decode_base64_payload(&B64.encode(b"abc")).unwrap();
        assert_eq!(bytes, b"abc");
        assert!(decode_base64_payload("***").is_err());
    }
}
