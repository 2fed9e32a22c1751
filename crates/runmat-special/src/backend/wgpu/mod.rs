pub mod bindings;
pub mod device;
pub mod dispatch;
pub mod params;

pub use device::{WgpuDevice, WgpuDeviceOptions, WgpuPipeline, WgpuProgram};
pub use params::SpecialParams;
