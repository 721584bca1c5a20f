//! Pre-flight checks on downloaded source files.

use std::path::Path;

use crate::error::{MediaError, MediaResult};

/// Reject downloads smaller than this; an MP4 header alone is bigger.
pub const MIN_SOURCE_BYTES: u64 = 1024;

/// Hard ceiling on source size to bound disk and encode time.
pub const MAX_SOURCE_BYTES: u64 = 500 * 1024 * 1024;

/// Validate a fetched source file before probing.
///
/// Rules, in order: the path must exist and be a regular file, the size
/// must be at least [`MIN_SOURCE_BYTES`] and at most [`MAX_SOURCE_BYTES`].
/// Returns the file size on success.
pub async fn validate_source(path: impl AsRef<Path>) -> MediaResult<u64> {
    let path = path.as_ref();

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| MediaError::SourceUnreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if !metadata.is_file() {
        return Err(MediaError::SourceUnreadable {
            path: path.to_path_buf(),
            message: "not a regular file".to_string(),
        });
    }

    let size = metadata.len();
    if size < MIN_SOURCE_BYTES {
        return Err(MediaError::SourceTooSmall { size });
    }
    if size > MAX_SOURCE_BYTES {
        return Err(MediaError::SourceTooLarge {
            size,
            limit: MAX_SOURCE_BYTES,
        });
    }

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = validate_source(dir.path().join("nope.mp4")).await.unwrap_err();
        assert!(matches!(err, MediaError::SourceUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_directory_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = validate_source(dir.path()).await.unwrap_err();
        assert!(matches!(err, MediaError::SourceUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_tiny_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.mp4");
        tokio::fs::write(&path, b"stub").await.unwrap();
        let err = validate_source(&path).await.unwrap_err();
        assert!(matches!(err, MediaError::SourceTooSmall { size: 4 }));
    }

    #[tokio::test]
    async fn test_valid_file_returns_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.mp4");
        tokio::fs::write(&path, vec![0u8; 4096]).await.unwrap();
        assert_eq!(validate_source(&path).await.unwrap(), 4096);
    }
}
