// ─── Integrity Verifier ───
// Streams staged files through a digest and compares against the declared value.

use std::path::Path;

use sha2::Digest;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest families found in Mojang, Maven and modpack metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Infer the algorithm from the length of a hex digest.
    pub fn from_hex_len(expected: &str) -> Option<Self> {
        match expected.trim().len() {
            32 => Some(Self::Md5),
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

/// Compute the lowercase hex digest of a file without loading it into memory.
pub async fn compute_digest(path: &Path, algorithm: DigestAlgorithm) -> LauncherResult<String> {
    match algorithm {
        DigestAlgorithm::Md5 => hash_file::<md5::Md5>(path).await,
        DigestAlgorithm::Sha1 => hash_file::<sha1::Sha1>(path).await,
        DigestAlgorithm::Sha256 => hash_file::<sha2::Sha256>(path).await,
    }
}

async fn hash_file<D: Digest>(path: &Path) -> LauncherResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(LauncherError::io(path))?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let count = file
            .read(&mut buffer)
            .await
            .map_err(LauncherError::io(path))?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check `path` against `expected`, returning the mismatch as an error.
///
/// An absent or blank expected digest means no verification was requested.
pub async fn check(path: &Path, expected: Option<&str>) -> LauncherResult<()> {
    let Some(expected) = expected.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    let Some(algorithm) = DigestAlgorithm::from_hex_len(expected) else {
        return Err(LauncherError::DigestMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual: format!("<unsupported digest length {}>", expected.len()),
        });
    };

    let actual = compute_digest(path, algorithm).await?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(LauncherError::DigestMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }

    debug!(path = %path.display(), ?algorithm, "Digest verified");
    Ok(())
}

/// `true` when the file matches `expected` (or nothing was expected).
pub async fn verify(path: &Path, expected: Option<&str>) -> LauncherResult<bool> {
    match check(path, expected).await {
        Ok(()) => Ok(true),
        Err(LauncherError::DigestMismatch { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // "hello world"
    const SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
    const MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
    const SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    async fn fixture() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn infers_algorithm_from_length() {
        let (_dir, path) = fixture().await;
        assert!(verify(&path, Some(SHA1)).await.unwrap());
        assert!(verify(&path, Some(MD5)).await.unwrap());
        assert!(verify(&path, Some(SHA256)).await.unwrap());
    }

    #[tokio::test]
    async fn comparison_is_case_insensitive() {
        let (_dir, path) = fixture().await;
        assert!(verify(&path, Some(&SHA1.to_uppercase())).await.unwrap());
    }

    #[tokio::test]
    async fn absent_or_blank_expected_passes() {
        let (_dir, path) = fixture().await;
        assert!(verify(&path, None).await.unwrap());
        assert!(verify(&path, Some("")).await.unwrap());
        assert!(verify(&path, Some("   ")).await.unwrap());
    }

    #[tokio::test]
    async fn mismatch_reports_actual_digest() {
        let (_dir, path) = fixture().await;
        let wrong = "0000000000000000000000000000000000000000";
        assert!(!verify(&path, Some(wrong)).await.unwrap());

        match check(&path, Some(wrong)).await {
            Err(LauncherError::DigestMismatch { actual, .. }) => assert_eq!(actual, SHA1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_length_is_a_mismatch() {
        let (_dir, path) = fixture().await;
        assert!(!verify(&path, Some("abc123")).await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let result = verify(&dir.path().join("missing"), Some(SHA1)).await;
        assert!(matches!(result, Err(LauncherError::Io { .. })));
    }
}
