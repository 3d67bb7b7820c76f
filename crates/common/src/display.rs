// Human-facing formatting helpers.

use std::fmt;

/// Number of hex characters shown for object ids in human-readable output.
pub const SHORT_SHA_LEN: usize = 8;

/// Display wrapper that truncates an object id to [`SHORT_SHA_LEN`] chars.
///
/// Presentation only: the wrapped value is never modified, so callers keep
/// passing the full id to remote calls and structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortSha<'a>(pub &'a str);

impl fmt::Display for ShortSha<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cut = self.0.char_indices().nth(SHORT_SHA_LEN).map_or(self.0.len(), |(idx, _)| idx);
        f.write_str(&self.0[..cut])
    }
}
