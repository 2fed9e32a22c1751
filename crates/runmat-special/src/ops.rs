//! Operator entry points and the per-context program/pipeline caches.

use runmat_special_api::{
    autograd_fallback, fallback_for, AutogradDecision, DispatchKey, FallbackKind, KernelProfiler,
    NoopProfiler, ScalarType, Tensor,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{persist_program, KernelCache, ProgramMeta, PROGRAM_CACHE_VERSION};
use crate::device::{KernelDevice, KernelLaunch};
use crate::error::{Result, SpecialError};
use crate::shaders;
use crate::telemetry::{KernelTelemetry, KernelTelemetrySnapshot};
use crate::types::{result_type, KernelFunction, ProgramKey};

/// A rendered and compiled special-function program for one type pair.
pub struct CompiledProgram<D: KernelDevice> {
    pub key: ProgramKey,
    pub label: String,
    pub program: D::Program,
}

/// One entry point of a [`CompiledProgram`], ready to launch. Holds its
/// program alive.
pub struct PipelineState<D: KernelDevice> {
    pub key: ProgramKey,
    pub function: KernelFunction,
    pub program: Arc<CompiledProgram<D>>,
    pub pipeline: D::Pipeline,
}

/// Kernel context: a device plus the caches that live as long as it does.
pub struct SpecialKernels<D: KernelDevice> {
    device: D,
    programs: KernelCache<CompiledProgram<D>>,
    pipelines: KernelCache<PipelineState<D>>,
    telemetry: KernelTelemetry,
    profiler: Arc<dyn KernelProfiler>,
    cache_dir: Option<PathBuf>,
}

impl<D: KernelDevice> SpecialKernels<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            programs: KernelCache::new("special_program_cache"),
            pipelines: KernelCache::new("special_pipeline_cache"),
            telemetry: KernelTelemetry::new(),
            profiler: Arc::new(NoopProfiler),
            cache_dir: None,
        }
    }

    pub fn with_profiler(mut self, profiler: Arc<dyn KernelProfiler>) -> Self {
        self.profiler = profiler;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Cached program for `key`, compiled on first use.
    pub fn compiled_program(&self, key: &ProgramKey) -> Result<Arc<CompiledProgram<D>>> {
        let cache_key = key.cache_key();
        self.programs.get_or_compile(&cache_key, || {
            let workgroup_size = self.device.workgroup_size();
            let source = shaders::render(key, workgroup_size);
            let label = format!("runmat-special-{cache_key}");
            let program = self
                .device
                .compile_program(key, &label, &source)
                .map_err(|err| SpecialError::Compilation {
                    key: cache_key.clone(),
                    diagnostic: format!("{err:#}"),
                })?;
            self.telemetry.record_program_compiled();
            log::debug!(
                "compiled special program {cache_key} on {} (wg={workgroup_size})",
                self.device.name()
            );
            self.persist(&cache_key, &label, workgroup_size, &source);
            Ok(CompiledProgram {
                key: *key,
                label,
                program,
            })
        })
    }

    /// Cached pipeline for `function` inside the program for `key`.
    pub fn pipeline(
        &self,
        key: &ProgramKey,
        function: KernelFunction,
    ) -> Result<Arc<PipelineState<D>>> {
        let pipeline_key = key.pipeline_key(function);
        self.pipelines.get_or_compile(&pipeline_key, || {
            let program = self.compiled_program(key)?;
            if !self.device.has_function(&program.program, function) {
                return Err(SpecialError::MissingFunction {
                    key: key.cache_key(),
                    function: function.name().to_string(),
                });
            }
            let pipeline = self
                .device
                .create_pipeline(&program.program, function)
                .map_err(|err| SpecialError::Pipeline {
                    key: pipeline_key.clone(),
                    diagnostic: format!("{err:#}"),
                })?;
            self.telemetry.record_pipeline_created();
            Ok(PipelineState {
                key: *key,
                function,
                program,
                pipeline,
            })
        })
    }

    pub fn lgamma(&self, x: &Tensor) -> Result<Tensor> {
        let out = allocate_output("lgamma", x)?;
        self.lgamma_out(x, &out)?;
        Ok(out)
    }

    pub fn lgamma_out(&self, x: &Tensor, out: &Tensor) -> Result<()> {
        self.run_unary("lgamma", KernelFunction::Lgamma, 0, x, out)
    }

    pub fn digamma(&self, x: &Tensor) -> Result<Tensor> {
        let out = allocate_output("digamma", x)?;
        self.digamma_out(x, &out)?;
        Ok(out)
    }

    pub fn digamma_out(&self, x: &Tensor, out: &Tensor) -> Result<()> {
        self.run_unary("digamma", KernelFunction::Digamma, 0, x, out)
    }

    pub fn polygamma(&self, order: i64, x: &Tensor) -> Result<Tensor> {
        let out = allocate_output("polygamma", x)?;
        self.polygamma_out(order, x, &out)?;
        Ok(out)
    }

    /// Order 0 and 1 run the digamma and trigamma kernels.
    pub fn polygamma_out(&self, order: i64, x: &Tensor, out: &Tensor) -> Result<()> {
        let function = KernelFunction::for_polygamma_order(order);
        self.run_unary("polygamma", function, order, x, out)
    }

    pub fn telemetry(&self) -> KernelTelemetrySnapshot {
        self.telemetry.snapshot(
            self.programs.counters().into(),
            self.pipelines.counters().into(),
        )
    }

    /// Fallback registered for these ops under `key`. They carry no
    /// derivative formula, so autograd keys route to the boxed fallback.
    pub fn autograd_policy(&self, key: DispatchKey) -> Option<FallbackKind> {
        fallback_for(key)
    }

    /// This crate never installs variable hooks, so autograd always
    /// redispatches to the primal kernel.
    pub fn autograd_decision(&self) -> AutogradDecision {
        autograd_fallback(false)
    }

    fn run_unary(
        &self,
        op: &'static str,
        function: KernelFunction,
        order: i64,
        input: &Tensor,
        output: &Tensor,
    ) -> Result<()> {
        for dtype in [input.scalar_type(), output.scalar_type()] {
            if dtype == ScalarType::F64 {
                return Err(SpecialError::UnsupportedDtype { op, dtype });
            }
        }
        if order < 0 {
            return Err(SpecialError::NegativeOrder { order });
        }
        if input.numel() != output.numel() {
            return Err(SpecialError::ShapeMismatch {
                op,
                input: input.numel(),
                output: output.numel(),
            });
        }
        let key = ProgramKey::new(input.scalar_type(), output.scalar_type())?;
        if output.numel() == 0 {
            return Ok(());
        }

        let pipeline = self.pipeline(&key, function)?;
        let src = input.contiguous();
        let needs_copy_back = !output.is_contiguous();
        let dst = if needs_copy_back {
            output.contiguous()
        } else {
            output.clone()
        };

        self.launch(&pipeline, &src, &dst, order)?;

        if needs_copy_back {
            output.copy_(&dst)?;
        }
        Ok(())
    }

    fn launch(
        &self,
        pipeline: &PipelineState<D>,
        src: &Tensor,
        dst: &Tensor,
        order: i64,
    ) -> Result<()> {
        let len = dst.numel();
        let type_key = pipeline.key.cache_key();
        let token = self
            .profiler
            .begin_profile_kernel(pipeline.function.name(), &type_key, len);
        let start = Instant::now();

        let output_offset = dst.offset();
        let result = if src.shares_storage(dst) {
            // In-place: read a snapshot so the storage lock is only taken for writing.
            let snapshot = src.to_data();
            dst.write(|output| {
                self.device.dispatch(
                    &pipeline.pipeline,
                    KernelLaunch {
                        input: &snapshot,
                        input_offset: 0,
                        output,
                        output_offset,
                        len,
                        order,
                    },
                )
            })
        } else {
            let input_offset = src.offset();
            src.read(|input| {
                dst.write(|output| {
                    self.device.dispatch(
                        &pipeline.pipeline,
                        KernelLaunch {
                            input,
                            input_offset,
                            output,
                            output_offset,
                            len,
                            order,
                        },
                    )
                })
            })
        };

        self.profiler.end_profile_kernel(token);
        result?;
        let elapsed = start.elapsed();
        self.telemetry.record_dispatch(len, elapsed);
        log::trace!(
            "{}:{} dispatched {len} elements in {:?}",
            type_key,
            pipeline.function,
            elapsed
        );
        Ok(())
    }

    fn persist(&self, key: &str, label: &str, workgroup_size: u32, source: &str) {
        let Some(dir) = self.cache_dir.as_deref() else {
            return;
        };
        let meta = ProgramMeta {
            label: label.to_string(),
            key: key.to_string(),
            device: self.device.name().to_string(),
            workgroup_size,
            entry_points: shaders::entry_points(source),
            version: Some(PROGRAM_CACHE_VERSION),
        };
        if let Err(err) = persist_program(dir, &meta, source) {
            log::warn!(
                "failed to persist special program {key} to {}: {err}",
                dir.display()
            );
        }
    }
}

fn allocate_output(op: &'static str, x: &Tensor) -> Result<Tensor> {
    let dtype = x.scalar_type();
    if dtype == ScalarType::F64 {
        return Err(SpecialError::UnsupportedDtype { op, dtype });
    }
    Ok(Tensor::zeros(x.shape(), result_type(dtype)))
}
