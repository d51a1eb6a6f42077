//! Template asset rules: kinds, upload size ceiling, content sniffing and
//! stored filenames.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Upload ceiling for a single asset (12 MiB).
pub const MAX_ASSET_BYTES: usize = 12 * 1024 * 1024;

/// Base name used when the uploaded filename sanitizes to nothing.
const FALLBACK_BASE_NAME: &str = "upload";

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Thumbnail,
    Cover,
    Preview,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [Self::Thumbnail, Self::Cover, Self::Preview];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Cover => "cover",
            Self::Preview => "preview",
        }
    }
}

impl FromStr for AssetKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| {
                CoreError::invalid_field("kind", "kind must be one of thumbnail, cover, preview")
            })
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Content checks
// ---------------------------------------------------------------------------

/// Image formats accepted for upload and for image processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detect the format from magic bytes. Declared content types and file
    /// extensions are ignored.
    pub fn sniff(bytes: &[u8]) -> Result<Self, CoreError> {
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Jpeg) => Ok(Self::Jpeg),
            Ok(image::ImageFormat::Png) => Ok(Self::Png),
            Ok(other) => Err(CoreError::UnsupportedMediaType(format!(
                "{other:?} images are not accepted; use JPEG or PNG"
            ))),
            Err(_) => Err(CoreError::UnsupportedMediaType(
                "content is not a JPEG or PNG image".into(),
            )),
        }
    }

    /// Map a reported MIME type back to a format. Parameters are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("image/jpeg") || essence.eq_ignore_ascii_case("image/jpg") {
            Some(Self::Jpeg)
        } else if essence.eq_ignore_ascii_case("image/png") {
            Some(Self::Png)
        } else {
            None
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Reject payloads over [`MAX_ASSET_BYTES`].
pub fn check_asset_size(size: usize) -> Result<(), CoreError> {
    if size > MAX_ASSET_BYTES {
        return Err(CoreError::PayloadTooLarge {
            size,
            limit: MAX_ASSET_BYTES,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Filenames
// ---------------------------------------------------------------------------

/// Build the stored filename `{base}-{timestamp}.{ext}`.
///
/// `base` is the uploaded file's stem with any directory part removed and
/// everything outside `[a-z0-9-_]` folded to `-`.
pub fn upload_filename(original: Option<&str>, format: ImageFormat, now: Timestamp) -> String {
    let base = original.map(sanitize_base_name).unwrap_or_default();
    let base = if base.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        base
    };
    format!(
        "{base}-{}.{}",
        now.format("%Y%m%dT%H%M%S%.9f"),
        format.extension()
    )
}

fn sanitize_base_name(original: &str) -> String {
    let normalized = original.replace('\\', "/");
    let file = normalized.rsplit('/').next().unwrap_or("");
    let stem = match file.rfind('.') {
        Some(0) | None => file,
        Some(idx) => &file[..idx],
    };

    let mut out = String::with_capacity(stem.len());
    for c in stem.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn kind_parsing() {
        assert_eq!("thumbnail".parse::<AssetKind>().unwrap(), AssetKind::Thumbnail);
        assert_eq!(" cover ".parse::<AssetKind>().unwrap(), AssetKind::Cover);
        assert_matches!("banner".parse::<AssetKind>(), Err(CoreError::Validation { fields, .. }) => {
            assert_eq!(fields, vec!["kind"]);
        });
    }

    #[test]
    fn sniffs_png_and_jpeg() {
        assert_eq!(ImageFormat::sniff(PNG_MAGIC).unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::sniff(JPEG_MAGIC).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn format_from_reported_mime() {
        assert_eq!(ImageFormat::from_mime("image/jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("IMAGE/PNG; charset=binary"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime("image/webp"), None);
    }

    #[test]
    fn rejects_other_content() {
        assert_matches!(
            ImageFormat::sniff(b"GIF89a........"),
            Err(CoreError::UnsupportedMediaType(_))
        );
        assert_matches!(
            ImageFormat::sniff(b"plain text, not an image"),
            Err(CoreError::UnsupportedMediaType(_))
        );
    }

    #[test]
    fn size_ceiling() {
        assert!(check_asset_size(MAX_ASSET_BYTES).is_ok());
        assert_matches!(
            check_asset_size(MAX_ASSET_BYTES + 1),
            Err(CoreError::PayloadTooLarge { limit: MAX_ASSET_BYTES, .. })
        );
    }

    #[test]
    fn filenames_are_sanitized_and_stamped() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(
            upload_filename(Some("../../etc/My Photo.PNG"), ImageFormat::Png, now),
            "my-photo-20240501T123000.000000000.png"
        );
        assert_eq!(
            upload_filename(Some("C:\\Users\\x\\cat.jpeg"), ImageFormat::Jpeg, now),
            "cat-20240501T123000.000000000.jpg"
        );
        assert_eq!(
            upload_filename(None, ImageFormat::Jpeg, now),
            "upload-20240501T123000.000000000.jpg"
        );
        assert_eq!(
            upload_filename(Some("???.png"), ImageFormat::Png, now),
            "upload-20240501T123000.000000000.png"
        );
    }
}
