use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const WORKGROUP_SIZE: u32 = 256;
pub const MAX_DISPATCH_WORKGROUPS: u32 = 65_535;

pub const ENV_BACKEND: &str = "RUNMAT_SPECIAL_BACKEND";
pub const ENV_WORKGROUP_SIZE: &str = "RUNMAT_SPECIAL_WG";
pub const ENV_FORCE_FALLBACK: &str = "RUNMAT_SPECIAL_FORCE_FALLBACK";
pub const ENV_CACHE_DIR: &str = "RUNMAT_SPECIAL_CACHE_DIR";

/// Which device backs the special-function kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendPreference {
    /// wgpu when an adapter is available, otherwise the host device.
    #[default]
    Auto,
    Wgpu,
    Host,
}

impl BackendPreference {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "wgpu" | "gpu" => Some(Self::Wgpu),
            "host" | "cpu" | "in-process" | "inprocess" => Some(Self::Host),
            _ => None,
        }
    }
}

/// Power preference used when requesting a wgpu adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    Auto,
    HighPerformance,
    LowPower,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SpecialOptions {
    pub backend: BackendPreference,
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
    pub workgroup_size: Option<u32>,
    /// Rendered programs are written here as `<key>.wgsl` / `<key>.json`.
    pub cache_dir: Option<PathBuf>,
}

impl Default for SpecialOptions {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            power_preference: PowerPreference::Auto,
            force_fallback_adapter: false,
            workgroup_size: None,
            cache_dir: None,
        }
    }
}

impl SpecialOptions {
    /// Defaults overridden by the `RUNMAT_SPECIAL_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from `lookup`; unparsable values are logged and ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_BACKEND) {
            match BackendPreference::parse(&raw) {
                Some(backend) => self.backend = backend,
                None => log::warn!(
                    "{ENV_BACKEND}='{raw}' not recognized (expected auto|wgpu|host); keeping {:?}",
                    self.backend
                ),
            }
        }
        if let Some(raw) = lookup(ENV_WORKGROUP_SIZE) {
            match raw.trim().parse::<u32>() {
                Ok(wg) if wg > 0 => self.workgroup_size = Some(wg),
                _ => log::warn!("{ENV_WORKGROUP_SIZE}='{raw}' is not a positive integer; ignoring"),
            }
        }
        if let Some(flag) = lookup(ENV_FORCE_FALLBACK).and_then(|raw| parse_bool(&raw)) {
            self.force_fallback_adapter = flag;
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            let dir = dir.trim();
            if !dir.is_empty() {
                self.cache_dir = Some(PathBuf::from(dir));
            }
        }
        self
    }

    pub fn effective_workgroup_size(&self) -> u32 {
        self.workgroup_size
            .filter(|wg| *wg > 0)
            .unwrap_or(WORKGROUP_SIZE)
    }
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
