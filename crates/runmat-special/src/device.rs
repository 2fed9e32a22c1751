use runmat_special_api::TensorData;

use crate::types::{KernelFunction, ProgramKey};

/// One elementwise launch. `input` and `output` are contiguous ranges of
/// `len` elements starting at the given storage offsets.
pub struct KernelLaunch<'a> {
    pub input: &'a TensorData,
    pub input_offset: usize,
    pub output: &'a mut TensorData,
    pub output_offset: usize,
    pub len: usize,
    /// Polygamma order; ignored by the other kernels.
    pub order: i64,
}

/// Compute backend the special-function kernels run on.
///
/// Programs are compiled once per [`ProgramKey`] and pipelines once per
/// (key, function); the caller owns both caches.
pub trait KernelDevice: Send + Sync {
    type Program: Send + Sync;
    type Pipeline: Send + Sync;

    fn name(&self) -> &str;

    /// Workgroup size programs for this device are rendered with.
    fn workgroup_size(&self) -> u32;

    fn compile_program(
        &self,
        key: &ProgramKey,
        label: &str,
        source: &str,
    ) -> anyhow::Result<Self::Program>;

    fn has_function(&self, program: &Self::Program, function: KernelFunction) -> bool;

    fn create_pipeline(
        &self,
        program: &Self::Program,
        function: KernelFunction,
    ) -> anyhow::Result<Self::Pipeline>;

    /// Run `pipeline` over `launch`. Returns once results are in `launch.output`.
    fn dispatch(&self, pipeline: &Self::Pipeline, launch: KernelLaunch<'_>) -> anyhow::Result<()>;
}
