use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Bump this when the binding layout or the `Params` struct changes.
pub const PROGRAM_CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramMeta {
    pub label: String,
    pub key: String,
    pub device: String,
    pub workgroup_size: u32,
    pub entry_points: Vec<String>,
    /// Optional so older files still parse; absent means incompatible.
    pub version: Option<u32>,
}

impl ProgramMeta {
    pub fn is_current(&self) -> bool {
        self.version == Some(PROGRAM_CACHE_VERSION)
    }
}

pub fn source_path(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(format!("{key}.wgsl"))
}

pub fn meta_path(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(format!("{key}.json"))
}

/// Write `<key>.wgsl` and `<key>.json` under `cache_dir`.
pub fn persist_program(cache_dir: &Path, meta: &ProgramMeta, wgsl_src: &str) -> io::Result<()> {
    std::fs::create_dir_all(cache_dir)?;
    std::fs::write(source_path(cache_dir, &meta.key), wgsl_src)?;
    let json = serde_json::to_vec_pretty(meta).map_err(io::Error::other)?;
    std::fs::write(meta_path(cache_dir, &meta.key), json)
}

pub fn load_program_meta(cache_dir: &Path, key: &str) -> Option<ProgramMeta> {
    let bytes = std::fs::read(meta_path(cache_dir, key)).ok()?;
    serde_json::from_slice(&bytes).ok()
}
