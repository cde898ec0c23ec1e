use crate::shared::Result;
use std::fs;
use std::path::Path;

/// Maximum size of a configuration file (1 MB)
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Reads a regular file as UTF-8 after checking its type and size
///
/// # Security
/// Uses `symlink_metadata()` so a symbolic link is rejected rather than
/// followed.
///
/// # Errors
/// Returns an error if:
/// - The path doesn't exist or cannot be inspected
/// - The path is a symbolic link or not a regular file
/// - The file is larger than `max_size` bytes
pub fn read_bounded_file(path: &Path, description: &str, max_size: u64) -> Result<String> {
    let metadata = fs::symlink_metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {} metadata: {}", description, e))?;

    if metadata.is_symlink() {
        anyhow::bail!(
            "Security: {} is a symbolic link. For security reasons, symbolic links are not allowed.",
            path.display()
        );
    }

    if !metadata.is_file() {
        anyhow::bail!("{} is not a regular file", path.display());
    }

    if metadata.len() > max_size {
        anyhow::bail!(
            "Security: {} is too large ({} bytes). Maximum allowed size is {} bytes.",
            path.display(),
            metadata.len(),
            max_size
        );
    }

    fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {} {}: {}", description, path.display(), e))
}

/// Checks that `path` can be written without following a symbolic link
///
/// # Errors
/// Returns an error if the parent directory is missing or the path is an
/// existing symbolic link.
pub fn validate_output_target(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if parent != Path::new("") && !parent.is_dir() {
            anyhow::bail!("Parent directory does not exist: {}", parent.display());
        }
    }

    if let Ok(metadata) = fs::symlink_metadata(path) {
        if metadata.is_symlink() {
            anyhow::bail!(
                "Security: {} is a symbolic link. For security reasons, writing to symbolic links is not allowed.",
                path.display()
            );
        }
    }

    Ok(())
}
