//! Cache locator.

use std::path::PathBuf;

/// Return the first candidate that exists on disk, in priority order.
pub fn locate_cache(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.exists()).cloned()
}
