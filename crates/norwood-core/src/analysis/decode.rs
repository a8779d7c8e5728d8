//! Image validation and decoding with limits and timeout support.
//!
//! Validation runs before decode: file existence, size limit, and image
//! magic bytes. Decode itself runs under `spawn_blocking` with a timeout
//! so a pathological file cannot stall the pipeline.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::AnalysisError;

/// Image decoder with configurable limits and timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Original file size in bytes
    pub file_size: u64,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Quick validation before full decode.
    ///
    /// Checks the file exists, is within the size limit, and starts with
    /// valid image magic bytes.
    pub fn validate(&self, path: &Path) -> Result<(), AnalysisError> {
        if !path.exists() {
            return Err(AnalysisError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| AnalysisError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read metadata: {}", e),
        })?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(AnalysisError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        self.check_magic_bytes(path)
    }

    /// Decode an image from an in-memory byte buffer with validation and timeout.
    ///
    /// Used when the file has already been read (hashing and decoding
    /// share one read).
    pub async fn decode_from_bytes(
        &self,
        bytes: Vec<u8>,
        path: &Path,
    ) -> Result<DecodedImage, AnalysisError> {
        let file_size = bytes.len() as u64;
        let path_owned = path.to_path_buf();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::decode_bytes_sync(bytes, &path_owned)).await
        })
        .await;

        match decode_result {
            Ok(Ok(Ok(mut decoded))) => {
                if decoded.width > self.limits.max_image_dimension
                    || decoded.height > self.limits.max_image_dimension
                {
                    return Err(AnalysisError::ImageTooLarge {
                        path: path.to_path_buf(),
                        width: decoded.width,
                        height: decoded.height,
                        max_dim: self.limits.max_image_dimension,
                    });
                }
                decoded.file_size = file_size;
                Ok(decoded)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(AnalysisError::Decode {
                path: path.to_path_buf(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(AnalysisError::Timeout {
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode from bytes (runs in spawn_blocking).
    fn decode_bytes_sync(bytes: Vec<u8>, path: &Path) -> Result<DecodedImage, AnalysisError> {
        use std::io::Cursor;

        let file_size = bytes.len() as u64;
        let cursor = Cursor::new(bytes);
        let reader = image::ImageReader::new(cursor)
            .with_guessed_format()
            .map_err(|e| AnalysisError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(path).map_err(|_| AnalysisError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?,
        };
        let image = reader.decode().map_err(|e| AnalysisError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            file_size,
        })
    }

    /// Check file magic bytes to verify it's a valid image format.
    fn check_magic_bytes(&self, path: &Path) -> Result<(), AnalysisError> {
        let mut file = std::fs::File::open(path).map_err(|e| AnalysisError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot open file: {}", e),
        })?;

        let mut header = [0u8; 12];
        let bytes_read = file.read(&mut header).unwrap_or(0);

        if bytes_read < 4 {
            return Err(AnalysisError::Decode {
                path: path.to_path_buf(),
                message: "File too small to be a valid image".to_string(),
            });
        }

        if !Self::is_valid_image_header(&header, bytes_read) {
            return Err(AnalysisError::Decode {
                path: path.to_path_buf(),
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            });
        }

        Ok(())
    }

    /// Check if the header bytes match known image formats.
    fn is_valid_image_header(header: &[u8; 12], bytes_read: usize) -> bool {
        if bytes_read < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
            return true;
        }

        // PNG: 89 50 4E 47
        if header[0] == 0x89 && header[1] == b'P' && header[2] == b'N' && header[3] == b'G' {
            return true;
        }

        // WebP: RIFF....WEBP
        if header[0] == b'R' && header[1] == b'I' && header[2] == b'F' && header[3] == b'F' {
            if bytes_read >= 12 {
                return header[8] == b'W'
                    && header[9] == b'E'
                    && header[10] == b'B'
                    && header[11] == b'P';
            }
            // Could be WebP, allow it to proceed
            return true;
        }

        // BMP: BM
        if header[0] == b'B' && header[1] == b'M' {
            return true;
        }

        // HEIC/HEIF: ftyp box at offset 4
        if bytes_read >= 12
            && header[4] == b'f'
            && header[5] == b't'
            && header[6] == b'y'
            && header[7] == b'p'
        {
            return true;
        }

        false
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}
