//! Special-function kernels (log-gamma, digamma, trigamma, polygamma) for
//! RunMat tensors.
//!
//! Each function exists twice with the same structure and constants: as a
//! WGSL template compiled per element-type pair (`shaders`), and as
//! single-precision Rust (`math`) that backs the in-process device and serves
//! as the reference in tests. [`SpecialKernels`] owns the program and
//! pipeline caches for one device.

pub mod backend;
pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod math;
pub mod ops;
pub mod shaders;
pub mod telemetry;
pub mod types;

pub use backend::{HostDevice, SpecialDevice};
pub use config::{BackendPreference, PowerPreference, SpecialOptions};
pub use device::{KernelDevice, KernelLaunch};
pub use error::{Result, SpecialError};
pub use ops::{CompiledProgram, PipelineState, SpecialKernels};
pub use telemetry::{CacheCounters, KernelTelemetrySnapshot};
pub use types::{result_type, KernelFunction, ProgramKey};

pub use runmat_special_api as api;

/// Build a kernel context for the device `opts` selects. `Auto` falls back
/// to the host device when no wgpu adapter can be opened.
pub fn initialize_special_kernels(opts: &SpecialOptions) -> Result<SpecialKernels<SpecialDevice>> {
    let device = SpecialDevice::from_options(opts)?;
    log::info!(
        "special kernels using device '{}' (wg={})",
        device.name(),
        device.workgroup_size()
    );
    let mut kernels = SpecialKernels::new(device);
    if let Some(dir) = &opts.cache_dir {
        kernels = kernels.with_cache_dir(dir.clone());
    }
    Ok(kernels)
}
