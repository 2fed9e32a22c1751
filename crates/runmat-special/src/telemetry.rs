use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct KernelTelemetry {
    programs_compiled: AtomicU64,
    pipelines_created: AtomicU64,
    dispatches: AtomicU64,
    elements: AtomicU64,
    dispatch_wall_ns: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
}

impl From<(u64, u64)> for CacheCounters {
    fn from((hits, misses): (u64, u64)) -> Self {
        Self { hits, misses }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KernelTelemetrySnapshot {
    pub programs_compiled: u64,
    pub pipelines_created: u64,
    pub dispatches: u64,
    pub elements: u64,
    pub dispatch_wall_ns: u64,
    pub program_cache: CacheCounters,
    pub pipeline_cache: CacheCounters,
}

impl KernelTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_program_compiled(&self) {
        self.programs_compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pipeline_created(&self) {
        self.pipelines_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self, elements: usize, duration: Duration) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.elements.fetch_add(elements as u64, Ordering::Relaxed);
        let wall_ns = saturating_duration_ns(duration);
        if wall_ns > 0 {
            self.dispatch_wall_ns.fetch_add(wall_ns, Ordering::Relaxed);
        }
    }

    pub fn snapshot(
        &self,
        program_cache: CacheCounters,
        pipeline_cache: CacheCounters,
    ) -> KernelTelemetrySnapshot {
        KernelTelemetrySnapshot {
            programs_compiled: self.programs_compiled.load(Ordering::Relaxed),
            pipelines_created: self.pipelines_created.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            elements: self.elements.load(Ordering::Relaxed),
            dispatch_wall_ns: self.dispatch_wall_ns.load(Ordering::Relaxed),
            program_cache,
            pipeline_cache,
        }
    }
}

fn saturating_duration_ns(duration: Duration) -> u64 {
    duration.as_nanos().min(u64::MAX as u128) as u64
}
