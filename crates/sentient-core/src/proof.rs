//! Proof-of-payment file validation.
//!
//! Checks run before any upload is attempted. They are advisory: the object
//! store does not re-enforce them.

use serde::Serialize;

/// Largest accepted proof file (5 MiB).
pub const MAX_PROOF_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types accepted as proof of payment.
pub const ALLOWED_PROOF_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
];

/// Kind of an accepted proof file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    /// JPEG image.
    Jpeg,
    /// PNG image.
    Png,
    /// GIF image.
    Gif,
    /// WebP image.
    Webp,
    /// PDF document.
    Pdf,
}

impl ProofKind {
    /// Resolve an accepted MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        // drop parameters such as "; charset=binary"
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Resolve from a file name's extension.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Canonical MIME type.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    /// Canonical file extension (without the dot).
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Pdf => "pdf",
        }
    }
}

/// Why a proof file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofRejection {
    /// File exceeds [`MAX_PROOF_BYTES`].
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Limit in bytes.
        max: u64,
    },

    /// File type is not one of [`ALLOWED_PROOF_MIME_TYPES`].
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// File is empty.
    #[error("file is empty")]
    Empty,
}

/// Validate a proof file before upload.
///
/// The declared content type wins when present and not the generic
/// `application/octet-stream`; otherwise the type is inferred from the file
/// name's extension.
///
/// # Errors
///
/// Returns a [`ProofRejection`] if the file is empty, larger than 5 MiB, or
/// not an accepted image/PDF type.
pub fn validate_proof(
    file_name: &str,
    content_type: Option<&str>,
    size: u64,
) -> Result<ProofKind, ProofRejection> {
    if size == 0 {
        return Err(ProofRejection::Empty);
    }
    if size > MAX_PROOF_BYTES {
        return Err(ProofRejection::TooLarge {
            size,
            max: MAX_PROOF_BYTES,
        });
    }

    let declared = content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && !ct.starts_with("application/octet-stream"));

    match declared {
        Some(ct) => {
            ProofKind::from_mime(ct).ok_or_else(|| ProofRejection::UnsupportedType(ct.to_string()))
        }
        None => ProofKind::from_file_name(file_name)
            .ok_or_else(|| ProofRejection::UnsupportedType(file_name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn accepts_small_png() {
        assert_eq!(
            validate_proof("receipt.png", Some("image/png"), 2 * MIB),
            Ok(ProofKind::Png)
        );
    }

    #[test]
    fn rejects_six_megabytes() {
        assert_eq!(
            validate_proof("receipt.png", Some("image/png"), 6 * MIB),
            Err(ProofRejection::TooLarge {
                size: 6 * MIB,
                max: MAX_PROOF_BYTES
            })
        );
    }

    #[test]
    fn exactly_five_megabytes_is_allowed() {
        assert!(validate_proof("scan.pdf", Some("application/pdf"), MAX_PROOF_BYTES).is_ok());
    }

    #[test]
    fn rejects_executables() {
        assert!(matches!(
            validate_proof("setup.exe", Some("application/x-msdownload"), 1024),
            Err(ProofRejection::UnsupportedType(_))
        ));
        assert!(matches!(
            validate_proof("setup.exe", None, 1024),
            Err(ProofRejection::UnsupportedType(_))
        ));
        assert!(matches!(
            validate_proof("setup.exe", Some("application/octet-stream"), 1024),
            Err(ProofRejection::UnsupportedType(_))
        ));
    }

    #[test]
    fn infers_type_from_extension() {
        assert_eq!(validate_proof("IMG_001.JPEG", None, 10), Ok(ProofKind::Jpeg));
        assert_eq!(validate_proof("proof.webp", Some(""), 10), Ok(ProofKind::Webp));
    }

    #[test]
    fn rejects_empty_file() {
        assert_eq!(validate_proof("a.png", Some("image/png"), 0), Err(ProofRejection::Empty));
    }

    #[test]
    fn allowed_list_matches_kinds() {
        for mime in ALLOWED_PROOF_MIME_TYPES {
            assert_eq!(ProofKind::from_mime(mime).map(ProofKind::mime), Some(mime));
        }
    }
}
