use anyhow::{anyhow, ensure, Result};

use crate::config::WORKGROUP_SIZE;
use crate::device::{KernelDevice, KernelLaunch};
use crate::math;
use crate::shaders;
use crate::types::{KernelFunction, ProgramKey};

/// "Compiled" program for the in-process device: the validated entry points
/// of the rendered source.
#[derive(Debug, Clone)]
pub struct HostProgram {
    pub key: ProgramKey,
    pub label: String,
    pub entry_points: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct HostPipeline {
    pub function: KernelFunction,
}

/// Runs the kernels on the calling thread with the `crate::math` twins.
#[derive(Debug, Clone)]
pub struct HostDevice {
    workgroup_size: u32,
}

impl HostDevice {
    pub fn new(workgroup_size: u32) -> Self {
        Self {
            workgroup_size: workgroup_size.max(1),
        }
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new(WORKGROUP_SIZE)
    }
}

impl KernelDevice for HostDevice {
    type Program = HostProgram;
    type Pipeline = HostPipeline;

    fn name(&self) -> &str {
        "host"
    }

    fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    fn compile_program(&self, key: &ProgramKey, label: &str, source: &str) -> Result<HostProgram> {
        if let Some(placeholder) = shaders::unresolved_placeholder(source) {
            return Err(anyhow!("unresolved template placeholder {placeholder}"));
        }
        let entry_points = shaders::entry_points(source);
        ensure!(!entry_points.is_empty(), "source declares no compute entry points");
        Ok(HostProgram {
            key: *key,
            label: label.to_string(),
            entry_points,
        })
    }

    fn has_function(&self, program: &HostProgram, function: KernelFunction) -> bool {
        program.entry_points.iter().any(|name| name == function.name())
    }

    fn create_pipeline(&self, program: &HostProgram, function: KernelFunction) -> Result<HostPipeline> {
        log::debug!("host pipeline {}:{}", program.key, function);
        Ok(HostPipeline { function })
    }

    fn dispatch(&self, pipeline: &HostPipeline, launch: KernelLaunch<'_>) -> Result<()> {
        let KernelLaunch {
            input,
            input_offset,
            output,
            output_offset,
            len,
            order,
        } = launch;
        ensure!(
            input_offset + len <= input.len() && output_offset + len <= output.len(),
            "launch of {len} elements exceeds buffer bounds (input {}, output {})",
            input.len(),
            output.len()
        );
        for lane in 0..len {
            let x = input.get_f32(input_offset + lane);
            let y = math::evaluate(pipeline.function, x, order);
            output.set_f32(output_offset + lane, y);
        }
        Ok(())
    }
}
