pub mod host;
#[cfg(feature = "wgpu")]
pub mod wgpu;

use anyhow::{bail, Result};

use crate::config::{BackendPreference, SpecialOptions};
use crate::device::{KernelDevice, KernelLaunch};
use crate::types::{KernelFunction, ProgramKey};

pub use host::{HostDevice, HostPipeline, HostProgram};

/// Device chosen at initialization time.
pub enum SpecialDevice {
    Host(HostDevice),
    #[cfg(feature = "wgpu")]
    Wgpu(wgpu::WgpuDevice),
}

pub enum SpecialProgram {
    Host(HostProgram),
    #[cfg(feature = "wgpu")]
    Wgpu(wgpu::WgpuProgram),
}

pub enum SpecialPipeline {
    Host(HostPipeline),
    #[cfg(feature = "wgpu")]
    Wgpu(wgpu::WgpuPipeline),
}

impl SpecialDevice {
    pub fn from_options(opts: &SpecialOptions) -> Result<Self> {
        let host = || SpecialDevice::Host(HostDevice::new(opts.effective_workgroup_size()));
        match opts.backend {
            BackendPreference::Host => Ok(host()),
            #[cfg(feature = "wgpu")]
            BackendPreference::Wgpu => Ok(SpecialDevice::Wgpu(wgpu::WgpuDevice::new(opts.into())?)),
            #[cfg(not(feature = "wgpu"))]
            BackendPreference::Wgpu => bail!("wgpu backend requested but the `wgpu` feature is disabled"),
            #[cfg(feature = "wgpu")]
            BackendPreference::Auto => match wgpu::WgpuDevice::new(opts.into()) {
                Ok(device) => Ok(SpecialDevice::Wgpu(device)),
                Err(err) => {
                    log::warn!("special kernels: wgpu unavailable ({err:#}); using host device");
                    Ok(host())
                }
            },
            #[cfg(not(feature = "wgpu"))]
            BackendPreference::Auto => Ok(host()),
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, SpecialDevice::Host(_))
    }
}

impl KernelDevice for SpecialDevice {
    type Program = SpecialProgram;
    type Pipeline = SpecialPipeline;

    fn name(&self) -> &str {
        match self {
            SpecialDevice::Host(d) => d.name(),
            #[cfg(feature = "wgpu")]
            SpecialDevice::Wgpu(d) => d.name(),
        }
    }

    fn workgroup_size(&self) -> u32 {
        match self {
            SpecialDevice::Host(d) => d.workgroup_size(),
            #[cfg(feature = "wgpu")]
            SpecialDevice::Wgpu(d) => d.workgroup_size(),
        }
    }

    fn compile_program(&self, key: &ProgramKey, label: &str, source: &str) -> Result<SpecialProgram> {
        match self {
            SpecialDevice::Host(d) => d.compile_program(key, label, source).map(SpecialProgram::Host),
            #[cfg(feature = "wgpu")]
            SpecialDevice::Wgpu(d) => d.compile_program(key, label, source).map(SpecialProgram::Wgpu),
        }
    }

    fn has_function(&self, program: &SpecialProgram, function: KernelFunction) -> bool {
        match (self, program) {
            (SpecialDevice::Host(d), SpecialProgram::Host(p)) => d.has_function(p, function),
            #[cfg(feature = "wgpu")]
            (SpecialDevice::Wgpu(d), SpecialProgram::Wgpu(p)) => d.has_function(p, function),
            #[cfg(feature = "wgpu")]
            _ => false,
        }
    }

    fn create_pipeline(&self, program: &SpecialProgram, function: KernelFunction) -> Result<SpecialPipeline> {
        match (self, program) {
            (SpecialDevice::Host(d), SpecialProgram::Host(p)) => {
                d.create_pipeline(p, function).map(SpecialPipeline::Host)
            }
            #[cfg(feature = "wgpu")]
            (SpecialDevice::Wgpu(d), SpecialProgram::Wgpu(p)) => {
                d.create_pipeline(p, function).map(SpecialPipeline::Wgpu)
            }
            #[cfg(feature = "wgpu")]
            _ => bail!("program was compiled for a different device"),
        }
    }

    fn dispatch(&self, pipeline: &SpecialPipeline, launch: KernelLaunch<'_>) -> Result<()> {
        match (self, pipeline) {
            (SpecialDevice::Host(d), SpecialPipeline::Host(p)) => d.dispatch(p, launch),
            #[cfg(feature = "wgpu")]
            (SpecialDevice::Wgpu(d), SpecialPipeline::Wgpu(p)) => d.dispatch(p, launch),
            #[cfg(feature = "wgpu")]
            _ => bail!("pipeline was created for a different device"),
        }
    }
}
