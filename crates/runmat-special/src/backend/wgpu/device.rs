use anyhow::{anyhow, ensure, Result};
use futures::channel::oneshot;
use log::{debug, error, info};
use pollster::block_on;
use std::borrow::Cow;
use std::sync::Arc;
use wgpu::util::DeviceExt;

use super::bindings::build_special_bgl;
use super::dispatch::{chunk_capacity, dispatch_size, run, submit};
use super::params::SpecialParams;
use crate::config::{PowerPreference, SpecialOptions};
use crate::device::{KernelDevice, KernelLaunch};
use crate::shaders;
use crate::types::{KernelFunction, ProgramKey};
use runmat_special_api::ScalarType;

#[derive(Debug, Clone, Copy)]
pub struct WgpuDeviceOptions {
    pub power_preference: wgpu::PowerPreference,
    pub force_fallback_adapter: bool,
    pub workgroup_size: u32,
}

impl From<&SpecialOptions> for WgpuDeviceOptions {
    fn from(opts: &SpecialOptions) -> Self {
        let power_preference = match opts.power_preference {
            PowerPreference::Auto | PowerPreference::HighPerformance => {
                wgpu::PowerPreference::HighPerformance
            }
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        };
        Self {
            power_preference,
            force_fallback_adapter: opts.force_fallback_adapter,
            workgroup_size: opts.effective_workgroup_size(),
        }
    }
}

pub struct WgpuProgram {
    pub label: String,
    pub module: wgpu::ShaderModule,
    pub entry_points: Vec<String>,
}

pub struct WgpuPipeline {
    pub function: KernelFunction,
    pub pipeline: wgpu::ComputePipeline,
}

pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_info: wgpu::AdapterInfo,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    workgroup_size: u32,
}

impl WgpuDevice {
    pub fn new(opts: WgpuDeviceOptions) -> Result<Self> {
        block_on(Self::new_async(opts))
    }

    pub async fn new_async(opts: WgpuDeviceOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: opts.power_preference,
                force_fallback_adapter: opts.force_fallback_adapter,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| anyhow!("wgpu: no compatible adapter found"))?;
        let adapter_info = adapter.get_info();
        let limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("RunMat Special WGPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                },
                None,
            )
            .await?;
        install_device_error_handlers(&device);

        let workgroup_size = clamp_workgroup_size(opts.workgroup_size, &device.limits());
        let bind_group_layout = build_special_bgl(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("runmat-special-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        info!(
            "WGPU adapter '{}' ready for special kernels: backend={:?} wg={}",
            adapter_info.name, adapter_info.backend, workgroup_size
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            bind_group_layout,
            pipeline_layout,
            workgroup_size,
        })
    }

    /// Run `create` inside a validation error scope and surface any error it
    /// raised.
    fn scoped<T>(&self, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(self.device.as_ref());
        match block_on(self.device.pop_error_scope()) {
            Some(err) => Err(anyhow!("{err}")),
            None => Ok(value),
        }
    }

    fn map_readback_bytes(&self, staging: &wgpu::Buffer) -> Result<Vec<u8>> {
        let slice = staging.slice(..);
        let (tx, rx) = oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device.poll(wgpu::Maintain::Wait);
        let map_result = block_on(rx).map_err(|_| anyhow!("special: map_async callback dropped"))?;
        map_result.map_err(|e: wgpu::BufferAsyncError| anyhow!(e))?;
        let data = slice.get_mapped_range();
        let out = data.to_vec();
        drop(data);
        staging.unmap();
        Ok(out)
    }
}

impl KernelDevice for WgpuDevice {
    type Program = WgpuProgram;
    type Pipeline = WgpuPipeline;

    fn name(&self) -> &str {
        &self.adapter_info.name
    }

    fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    fn compile_program(&self, _key: &ProgramKey, label: &str, source: &str) -> Result<WgpuProgram> {
        let module = self.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            })
        })?;
        Ok(WgpuProgram {
            label: label.to_string(),
            module,
            entry_points: shaders::entry_points(source),
        })
    }

    fn has_function(&self, program: &WgpuProgram, function: KernelFunction) -> bool {
        program.entry_points.iter().any(|name| name == function.name())
    }

    fn create_pipeline(&self, program: &WgpuProgram, function: KernelFunction) -> Result<WgpuPipeline> {
        let label = format!("{}:{}", program.label, function);
        let pipeline = self.scoped(|device| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label.as_str()),
                layout: Some(&self.pipeline_layout),
                module: &program.module,
                entry_point: function.name(),
            })
        })?;
        debug!("created special pipeline {label}");
        Ok(WgpuPipeline { function, pipeline })
    }

    fn dispatch(&self, pipeline: &WgpuPipeline, launch: KernelLaunch<'_>) -> Result<()> {
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
            "special: launch of {len} elements exceeds buffer bounds"
        );

        let out_elem = output.scalar_type().size_in_bytes();
        let segment = self.segment_capacity(input.scalar_type(), output.scalar_type());
        ensure!(
            segment > 0,
            "special: device storage binding limit of {} bytes cannot hold one element",
            self.device.limits().max_storage_buffer_binding_size
        );
        if len > segment {
            debug!("special: splitting {len} elements into segments of {segment} for storage bindings");
        }

        let mut start = 0usize;
        while start < len {
            let seg_len = (len - start).min(segment);
            let src_bytes = input.bytes(input_offset + start, seg_len);
            let bytes = self
                .scoped(|device| {
                    self.run_segment(device, pipeline, src_bytes, seg_len, out_elem, order)
                })
                .and_then(|res| res)
                .map_err(|err| anyhow!("special: {} launch failed: {err:#}", pipeline.function))?;
            output.write_bytes(output_offset + start, &bytes)?;
            start += seg_len;
        }
        Ok(())
    }
}

impl WgpuDevice {
    /// Elements per segment such that both the input and the output buffer
    /// of a segment fit a single storage binding.
    pub fn segment_capacity(&self, input: ScalarType, output: ScalarType) -> usize {
        binding_capacity(
            &self.device.limits(),
            input.size_in_bytes().max(output.size_in_bytes()),
        )
    }

    /// Upload one segment, run it in workgroup-limited chunks and read the
    /// output back. Runs inside a validation error scope.
    fn run_segment(
        &self,
        device: &wgpu::Device,
        pipeline: &WgpuPipeline,
        src_bytes: &[u8],
        len: usize,
        out_elem: usize,
        order: i64,
    ) -> Result<Vec<u8>> {
        let out_bytes = (len * out_elem) as u64;
        let src = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("runmat-special-src"),
            contents: src_bytes,
            usage: wgpu::BufferUsages::STORAGE,
        });
        let dst = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("runmat-special-dst"),
            size: out_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let capacity = chunk_capacity(self.workgroup_size);
        let mut offset = 0usize;
        while offset < len {
            let chunk_len = (len - offset).min(capacity);
            let params = SpecialParams::new(chunk_len as u32, offset as u32, order);
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("runmat-special-params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("runmat-special-bind"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: src.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: dst.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            });
            let groups = dispatch_size(chunk_len as u32, self.workgroup_size);
            run(device, &self.queue, &pipeline.pipeline, &bind_group, groups);
            offset += chunk_len;
        }

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("runmat-special-staging"),
            size: out_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut enc = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("runmat-special-readback"),
        });
        enc.copy_buffer_to_buffer(&dst, 0, &staging, 0, out_bytes);
        submit(device, &self.queue, enc);
        self.map_readback_bytes(&staging)
    }
}

/// Elements of `elem_bytes` that fit one storage binding, capped so a
/// segment stays indexable by the shader's `u32` lane ids.
fn binding_capacity(limits: &wgpu::Limits, elem_bytes: usize) -> usize {
    let max_bytes = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    let elems = max_bytes / elem_bytes.max(1) as u64;
    elems.min(u32::MAX as u64) as usize
}

fn clamp_workgroup_size(requested: u32, limits: &wgpu::Limits) -> u32 {
    let max = limits
        .max_compute_workgroup_size_x
        .min(limits.max_compute_invocations_per_workgroup)
        .max(1);
    if requested > max {
        log::warn!("special: workgroup size {requested} exceeds device limit {max}; clamping");
    }
    requested.clamp(1, max)
}

/// Launch work runs inside error scopes, so anything reaching these handlers
/// escaped a scope and indicates a bug or a lost device.
fn install_device_error_handlers(device: &wgpu::Device) {
    device.on_uncaptured_error(Box::new(|err| {
        error!("special: unexpected wgpu error outside an error scope: {err}");
    }));
    device.set_device_lost_callback(|reason, message| {
        error!("special: wgpu device lost ({reason:?}): {message}");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workgroup_size_respects_limits() {
        let limits = wgpu::Limits::default();
        assert_eq!(clamp_workgroup_size(64, &limits), 64);
        assert_eq!(
            clamp_workgroup_size(4096, &limits),
            limits.max_compute_invocations_per_workgroup
        );
        assert_eq!(clamp_workgroup_size(0, &limits), 1);
    }

    #[test]
    fn segments_fit_the_storage_binding_limit() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 1 << 20,
            max_buffer_size: 1 << 30,
            ..wgpu::Limits::default()
        };
        assert_eq!(binding_capacity(&limits, 4), 1 << 18);

        let tight_buffer = wgpu::Limits {
            max_buffer_size: 1 << 12,
            ..limits.clone()
        };
        assert_eq!(binding_capacity(&tight_buffer, 4), 1 << 10);
        let too_small = wgpu::Limits {
            max_storage_buffer_binding_size: 2,
            ..limits
        };
        assert_eq!(binding_capacity(&too_small, 4), 0);
    }

    #[test]
    fn options_follow_special_options() {
        let opts = SpecialOptions {
            power_preference: PowerPreference::LowPower,
            force_fallback_adapter: true,
            workgroup_size: Some(32),
            ..SpecialOptions::default()
        };
        let wgpu_opts = WgpuDeviceOptions::from(&opts);
        assert_eq!(wgpu_opts.power_preference, wgpu::PowerPreference::LowPower);
        assert!(wgpu_opts.force_fallback_adapter);
        assert_eq!(wgpu_opts.workgroup_size, 32);
    }
}
