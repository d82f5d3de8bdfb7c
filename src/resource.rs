//! Resource listing: enumerate installed mode/charset files from a
//! directory on disk (spec section 6, "list available modes enumerated
//! from a known resource directory").
//!
//! The teacher resolves a per-user cache directory for downloaded GGUF
//! models the same way most CLI tools do, via `dirs`; this crate has no
//! model cache, but the shape is identical — a default root the caller
//! can override, and a walk over it that never fails, just returns fewer
//! results when the directory is missing or unreadable.

use std::fs;
use std::path::{Path, PathBuf};

const MODE_EXTENSION: &str = "gmode";
const CHARSET_EXTENSION: &str = "gcharset";

/// One mode or charset file found under a resource root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Mode,
    Charset,
}

/// `<data dir>/glaemscribe/modes`, the conventional install location for
/// mode and charset files when the caller doesn't supply their own root.
pub fn default_resource_root() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("glaemscribe").join("modes"))
}

/// List every `.gmode`/`.gcharset` file directly under `root`, sorted by
/// name. Returns an empty list rather than an error if `root` doesn't
/// exist or isn't readable — resource listing is advisory, not load-bearing
/// (a caller who wants a hard failure should check `root.exists()` first).
pub fn list_available_modes(root: &Path) -> Vec<ModeDescriptor> {
    let Ok(entries) = fs::read_dir(root) else {
        log::debug!("resource root {} is not readable, returning no modes", root.display());
        return Vec::new();
    };

    let mut descriptors: Vec<ModeDescriptor> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            let ext = path.extension()?.to_str()?;
            let kind = match ext {
                MODE_EXTENSION => ResourceKind::Mode,
                CHARSET_EXTENSION => ResourceKind::Charset,
                _ => return None,
            };
            let name = path.file_stem()?.to_str()?.to_string();
            Some(ModeDescriptor { name, path, kind })
        })
        .collect();

    descriptors.sort_by(|a, b| a.name.cmp(&b.name));
    descriptors
}
