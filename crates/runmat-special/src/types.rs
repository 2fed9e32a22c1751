use runmat_special_api::ScalarType;
use std::fmt;

use crate::error::{Result, SpecialError};

/// Named entry points of the special-function program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelFunction {
    Lgamma,
    Digamma,
    Trigamma,
    Polygamma,
}

impl KernelFunction {
    pub const ALL: [KernelFunction; 4] = [
        KernelFunction::Lgamma,
        KernelFunction::Digamma,
        KernelFunction::Trigamma,
        KernelFunction::Polygamma,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KernelFunction::Lgamma => "lgamma",
            KernelFunction::Digamma => "digamma",
            KernelFunction::Trigamma => "trigamma",
            KernelFunction::Polygamma => "polygamma",
        }
    }

    /// Orders 0 and 1 have dedicated kernels; everything above goes through
    /// the general zeta formula.
    pub fn for_polygamma_order(order: i64) -> Self {
        match order {
            0 => KernelFunction::Digamma,
            1 => KernelFunction::Trigamma,
            _ => KernelFunction::Polygamma,
        }
    }
}

impl fmt::Display for KernelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type pair a program is specialised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub input: ScalarType,
    pub output: ScalarType,
}

impl ProgramKey {
    pub fn new(input: ScalarType, output: ScalarType) -> Result<Self> {
        if input == ScalarType::F64 || output != ScalarType::F32 {
            return Err(SpecialError::UnsupportedTypePair { input, output });
        }
        Ok(Self { input, output })
    }

    /// Program cache key: the two type names concatenated, e.g. `i32f32`.
    pub fn cache_key(&self) -> String {
        format!("{}{}", self.input.type_name(), self.output.type_name())
    }

    /// Pipeline cache key, e.g. `f32f32:polygamma`.
    pub fn pipeline_key(&self, function: KernelFunction) -> String {
        format!("{}:{}", self.cache_key(), function.name())
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Output element type the functional entry points allocate.
pub fn result_type(input: ScalarType) -> ScalarType {
    match input {
        ScalarType::F64 => ScalarType::F64,
        _ => ScalarType::F32,
    }
}
