//! Filesystem utilities for promoting finished output files.

use std::path::Path;

use tokio::fs;

use crate::error::{ConversionError, ConversionResult};

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// Attempts a fast rename first. If that fails with EXDEV (cross-device
/// link error), falls back to copy-and-delete, copying to a temp file on
/// the destination filesystem first so the final rename stays atomic.
///
/// Overwrites `dst` if it exists.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> ConversionResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "cross-device rename, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(promote_error(src, dst, e)),
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV is error code 18 on Linux/macOS
    e.raw_os_error() == Some(18)
}

/// Copy file to destination (via temp file) then delete the source.
async fn copy_and_delete(src: &Path, dst: &Path) -> ConversionResult<()> {
    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst)
        .await
        .map_err(|e| promote_error(src, &tmp_dst, e))?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(promote_error(&tmp_dst, dst, e));
    }

    // Best effort: the output is already in place
    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "failed to remove intermediate file {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

fn promote_error(src: &Path, dst: &Path, e: std::io::Error) -> ConversionError {
    ConversionError::encode_failure(
        format!(
            "failed to move output into place: {} -> {}: {}",
            src.display(),
            dst.display(),
            e
        ),
        None,
        None,
    )
}
