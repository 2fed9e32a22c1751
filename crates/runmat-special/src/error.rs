use runmat_special_api::{ScalarType, TensorError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecialError {
    #[error("{op}: scalar type {dtype} is not supported by this backend")]
    UnsupportedDtype { op: &'static str, dtype: ScalarType },
    #[error("no kernel specialization for input {input} with output {output}")]
    UnsupportedTypePair {
        input: ScalarType,
        output: ScalarType,
    },
    #[error("polygamma: order must be non-negative, got {order}")]
    NegativeOrder { order: i64 },
    #[error("{op}: output has {output} elements but input has {input}")]
    ShapeMismatch {
        op: &'static str,
        input: usize,
        output: usize,
    },
    #[error("failed to compile special-function program '{key}': {diagnostic}")]
    Compilation { key: String, diagnostic: String },
    #[error("function '{function}' not found in program '{key}'")]
    MissingFunction { key: String, function: String },
    #[error("failed to create pipeline '{key}': {diagnostic}")]
    Pipeline { key: String, diagnostic: String },
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error("device error: {0:#}")]
    Device(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SpecialError>;
