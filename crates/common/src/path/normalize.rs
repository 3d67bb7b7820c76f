// Mount path canonicalization: separator cleanup, traversal rejection, 4096 byte max.

use thiserror::Error;

/// Maximum allowed mount path length in bytes (git's own PATH_MAX guard).
const MAX_PATH_BYTES: usize = 4096;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path exceeds maximum length of {MAX_PATH_BYTES} bytes")]
    TooLong,

    #[error("path contains directory traversal component: {0}")]
    Traversal(String),

    #[error("path contains null byte")]
    NullByte,

    #[error("path contains invalid component: {0}")]
    InvalidComponent(String),
}

/// Normalize the path at which a submodule is mounted in the parent tree.
///
/// The result is used verbatim as a tree entry path, so it must be relative
/// to the repository root with `/` separators.
///
/// Rules:
/// - Convert `\` separators to `/`
/// - Collapse consecutive `/` into one
/// - Strip leading and trailing `/`
/// - Reject `.` and `..` components
/// - Reject the `.git` component
/// - Reject null bytes and empty paths
pub fn normalize_mount_path(input: &str) -> Result<String, PathError> {
    if input.trim().is_empty() {
        return Err(PathError::Empty);
    }

    if input.contains('\0') {
        return Err(PathError::NullByte);
    }

    let unified = input.replace('\\', "/");
    let components: Vec<&str> = unified.split('/').filter(|s| !s.is_empty()).collect();

    if components.is_empty() {
        return Err(PathError::Empty);
    }

    for component in &components {
        match *component {
            "." | ".." => return Err(PathError::Traversal((*component).to_string())),
            ".git" => return Err(PathError::InvalidComponent(".git".to_string())),
            _ => {}
        }
        if component.trim().is_empty() {
            return Err(PathError::InvalidComponent("(whitespace-only component)".to_string()));
        }
    }

    let result = components.join("/");

    if result.len() > MAX_PATH_BYTES {
        return Err(PathError::TooLong);
    }

    Ok(result)
}
