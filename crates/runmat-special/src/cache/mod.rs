pub mod persist;
pub mod registry;

pub use persist::{load_program_meta, persist_program, ProgramMeta, PROGRAM_CACHE_VERSION};
pub use registry::KernelCache;
