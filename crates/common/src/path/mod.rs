pub mod normalize;

pub use normalize::{normalize_mount_path, PathError};
