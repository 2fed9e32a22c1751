//! Host-side contracts consumed by the RunMat special-function kernels.
//!
//! The kernels never own tensors. They read an input buffer and write an
//! output buffer positionally, so this crate only carries what the dispatch
//! layer needs from the tensor framework: element type, element count,
//! contiguity, `contiguous()` materialisation and `copy_()` write-back.
//! Profiler and autograd-fallback contracts live here for the same reason.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

pub mod autograd;

pub use autograd::{autograd_fallback, fallback_for, AutogradDecision, DispatchKey, FallbackKind};

/// Element kinds understood by the special-function backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    F32,
    I32,
    U32,
    F64,
}

impl ScalarType {
    /// Identifier used both in cache keys and as the WGSL scalar type name.
    pub fn type_name(self) -> &'static str {
        match self {
            ScalarType::F32 => "f32",
            ScalarType::I32 => "i32",
            ScalarType::U32 => "u32",
            ScalarType::F64 => "f64",
        }
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            ScalarType::F64 => 8,
            _ => 4,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TensorError {
    #[error("shape {shape:?} needs {expected} elements but storage holds {actual}")]
    StorageLength {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("dtype mismatch: expected {expected}, found {found}")]
    DtypeMismatch {
        expected: ScalarType,
        found: ScalarType,
    },
    #[error("element count mismatch: destination has {dst}, source has {src}")]
    NumelMismatch { dst: usize, src: usize },
    #[error("dimension {dim} out of range for rank {rank}")]
    DimOutOfRange { dim: usize, rank: usize },
    #[error("narrow({dim}, {start}, {len}) exceeds extent {extent}")]
    NarrowOutOfRange {
        dim: usize,
        start: usize,
        len: usize,
        extent: usize,
    },
    #[error("byte length {actual} does not match buffer length {expected}")]
    ByteLength { expected: usize, actual: usize },
}

/// Flat, typed element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F64(Vec<f64>),
}

macro_rules! with_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            TensorData::F32($v) => $body,
            TensorData::I32($v) => $body,
            TensorData::U32($v) => $body,
            TensorData::F64($v) => $body,
        }
    };
}

impl TensorData {
    pub fn zeros(dtype: ScalarType, len: usize) -> Self {
        match dtype {
            ScalarType::F32 => TensorData::F32(vec![0.0; len]),
            ScalarType::I32 => TensorData::I32(vec![0; len]),
            ScalarType::U32 => TensorData::U32(vec![0; len]),
            ScalarType::F64 => TensorData::F64(vec![0.0; len]),
        }
    }

    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            TensorData::F32(_) => ScalarType::F32,
            TensorData::I32(_) => ScalarType::I32,
            TensorData::U32(_) => ScalarType::U32,
            TensorData::F64(_) => ScalarType::F64,
        }
    }

    /// Raw bytes of `len` elements starting at element `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        with_vec!(self, v => bytemuck::cast_slice(&v[offset..offset + len]))
    }

    /// Overwrite `bytes.len() / elem_size` elements starting at `offset`.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), TensorError> {
        let elem = self.scalar_type().size_in_bytes();
        let count = bytes.len() / elem;
        if bytes.len() % elem != 0 || offset + count > self.len() {
            return Err(TensorError::ByteLength {
                expected: (self.len().saturating_sub(offset)) * elem,
                actual: bytes.len(),
            });
        }
        with_vec!(self, v => {
            let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut v[offset..offset + count]);
            dst.copy_from_slice(bytes);
        });
        Ok(())
    }

    /// Element `index` converted the way a device kernel converts its input
    /// (`f32(x)` in WGSL).
    pub fn get_f32(&self, index: usize) -> f32 {
        match self {
            TensorData::F32(v) => v[index],
            TensorData::I32(v) => v[index] as f32,
            TensorData::U32(v) => v[index] as f32,
            TensorData::F64(v) => v[index] as f32,
        }
    }

    pub fn set_f32(&mut self, index: usize, value: f32) {
        match self {
            TensorData::F32(v) => v[index] = value,
            TensorData::I32(v) => v[index] = value as i32,
            TensorData::U32(v) => v[index] = value as u32,
            TensorData::F64(v) => v[index] = value as f64,
        }
    }

    fn gather(&self, offsets: &[usize]) -> TensorData {
        match self {
            TensorData::F32(v) => TensorData::F32(offsets.iter().map(|&o| v[o]).collect()),
            TensorData::I32(v) => TensorData::I32(offsets.iter().map(|&o| v[o]).collect()),
            TensorData::U32(v) => TensorData::U32(offsets.iter().map(|&o| v[o]).collect()),
            TensorData::F64(v) => TensorData::F64(offsets.iter().map(|&o| v[o]).collect()),
        }
    }

    fn scatter(&mut self, offsets: &[usize], src: &TensorData) -> Result<(), TensorError> {
        match (self, src) {
            (TensorData::F32(dst), TensorData::F32(s)) => scatter_into(dst, offsets, s),
            (TensorData::I32(dst), TensorData::I32(s)) => scatter_into(dst, offsets, s),
            (TensorData::U32(dst), TensorData::U32(s)) => scatter_into(dst, offsets, s),
            (TensorData::F64(dst), TensorData::F64(s)) => scatter_into(dst, offsets, s),
            (dst, s) => {
                return Err(TensorError::DtypeMismatch {
                    expected: dst.scalar_type(),
                    found: s.scalar_type(),
                })
            }
        }
        Ok(())
    }
}

fn scatter_into<T: Copy>(dst: &mut [T], offsets: &[usize], src: &[T]) {
    for (&o, &value) in offsets.iter().zip(src.iter()) {
        dst[o] = value;
    }
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    let mut stride = 1usize;
    for (dim, extent) in shape.iter().enumerate().rev() {
        strides[dim] = stride;
        stride = stride.saturating_mul(*extent);
    }
    strides
}

/// Strided view over shared host storage.
///
/// Views created by [`Tensor::transpose`] and [`Tensor::narrow`] alias the
/// storage of their base tensor, so a `copy_` into a view is visible through
/// the base.
#[derive(Debug, Clone)]
pub struct Tensor {
    storage: Arc<RwLock<TensorData>>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    offset: usize,
    dtype: ScalarType,
}

impl Tensor {
    pub fn new(data: TensorData, shape: Vec<usize>) -> Result<Self, TensorError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TensorError::StorageLength {
                shape,
                expected,
                actual: data.len(),
            });
        }
        let dtype = data.scalar_type();
        Ok(Self {
            strides: row_major_strides(&shape),
            storage: Arc::new(RwLock::new(data)),
            shape,
            offset: 0,
            dtype,
        })
    }

    pub fn from_f32(data: Vec<f32>, shape: Vec<usize>) -> Result<Self, TensorError> {
        Self::new(TensorData::F32(data), shape)
    }

    pub fn zeros(shape: &[usize], dtype: ScalarType) -> Self {
        let len = shape.iter().product();
        Self {
            storage: Arc::new(RwLock::new(TensorData::zeros(dtype, len))),
            strides: row_major_strides(shape),
            shape: shape.to_vec(),
            offset: 0,
            dtype,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element offset of the first logical element inside the storage.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.dtype
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Logical order matches storage order (dimensions of extent 1 are
    /// ignored, as their stride is never used).
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 1usize;
        for (extent, stride) in self.shape.iter().zip(self.strides.iter()).rev() {
            if *extent == 1 {
                continue;
            }
            if *stride != expected {
                return false;
            }
            expected = expected.saturating_mul(*extent);
        }
        true
    }

    pub fn shares_storage(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Returns `self` when already contiguous, otherwise a packed copy.
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() {
            return self.clone();
        }
        let data = self.to_data();
        Tensor {
            strides: row_major_strides(&self.shape),
            storage: Arc::new(RwLock::new(data)),
            shape: self.shape.clone(),
            offset: 0,
            dtype: self.dtype,
        }
    }

    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<Tensor, TensorError> {
        let rank = self.shape.len();
        for dim in [dim0, dim1] {
            if dim >= rank {
                return Err(TensorError::DimOutOfRange { dim, rank });
            }
        }
        let mut view = self.clone();
        view.shape.swap(dim0, dim1);
        view.strides.swap(dim0, dim1);
        Ok(view)
    }

    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Tensor, TensorError> {
        let rank = self.shape.len();
        if dim >= rank {
            return Err(TensorError::DimOutOfRange { dim, rank });
        }
        let extent = self.shape[dim];
        if start + len > extent {
            return Err(TensorError::NarrowOutOfRange {
                dim,
                start,
                len,
                extent,
            });
        }
        let mut view = self.clone();
        view.offset += start * self.strides[dim];
        view.shape[dim] = len;
        Ok(view)
    }

    /// Storage offsets of every logical element, in row-major logical order.
    pub fn storage_offsets(&self) -> Vec<usize> {
        let numel = self.numel();
        let mut offsets = Vec::with_capacity(numel);
        if numel == 0 {
            return offsets;
        }
        let rank = self.shape.len();
        let mut index = vec![0usize; rank];
        for _ in 0..numel {
            let linear: usize = index
                .iter()
                .zip(self.strides.iter())
                .map(|(i, s)| i * s)
                .sum();
            offsets.push(self.offset + linear);
            for dim in (0..rank).rev() {
                index[dim] += 1;
                if index[dim] < self.shape[dim] {
                    break;
                }
                index[dim] = 0;
            }
        }
        offsets
    }

    /// Packed copy of the logical elements.
    pub fn to_data(&self) -> TensorData {
        let offsets = self.storage_offsets();
        self.read(|data| data.gather(&offsets))
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        let data = self.to_data();
        (0..data.len()).map(|i| data.get_f32(i)).collect()
    }

    /// Write `src` into `self` element by element in logical order.
    pub fn copy_(&self, src: &Tensor) -> Result<(), TensorError> {
        if src.dtype != self.dtype {
            return Err(TensorError::DtypeMismatch {
                expected: self.dtype,
                found: src.dtype,
            });
        }
        if src.numel() != self.numel() {
            return Err(TensorError::NumelMismatch {
                dst: self.numel(),
                src: src.numel(),
            });
        }
        let packed = src.to_data();
        let offsets = self.storage_offsets();
        self.write(|data| data.scatter(&offsets, &packed))
    }

    pub fn read<R>(&self, f: impl FnOnce(&TensorData) -> R) -> R {
        let guard = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut TensorData) -> R) -> R {
        let mut guard = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Opaque handle returned by [`KernelProfiler::begin_profile_kernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileToken(pub u64);

/// Observability hook bracketing each kernel submission. Implementations must
/// not affect results.
pub trait KernelProfiler: Send + Sync {
    fn begin_profile_kernel(&self, kernel: &str, type_key: &str, elements: usize) -> ProfileToken;
    fn end_profile_kernel(&self, token: ProfileToken);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProfiler;

impl KernelProfiler for NoopProfiler {
    fn begin_profile_kernel(&self, _: &str, _: &str, _: usize) -> ProfileToken {
        ProfileToken(0)
    }

    fn end_profile_kernel(&self, _: ProfileToken) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_2x3() -> Tensor {
        Tensor::from_f32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).expect("tensor")
    }

    #[test]
    fn transpose_is_strided_view() {
        let base = matrix_2x3();
        let t = base.transpose(0, 1).expect("transpose");
        assert!(base.is_contiguous());
        assert!(!t.is_contiguous());
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.to_f32_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(t.contiguous().is_contiguous());
        assert!(!t.contiguous().shares_storage(&base));
    }

    #[test]
    fn narrow_rows_stays_contiguous_with_offset() {
        let base = matrix_2x3();
        let row = base.narrow(0, 1, 1).expect("narrow");
        assert!(row.is_contiguous());
        assert_eq!(row.offset(), 3);
        assert_eq!(row.to_f32_vec(), vec![4.0, 5.0, 6.0]);

        let col = base.narrow(1, 1, 2).expect("narrow");
        assert!(!col.is_contiguous());
        assert_eq!(col.to_f32_vec(), vec![2.0, 3.0, 5.0, 6.0]);
    }

    #[test]
    fn copy_into_view_writes_through_to_base() {
        let base = matrix_2x3();
        let t = base.transpose(0, 1).expect("transpose");
        let src = Tensor::from_f32(vec![10.0, 40.0, 20.0, 50.0, 30.0, 60.0], vec![3, 2])
            .expect("src");
        t.copy_(&src).expect("copy");
        assert_eq!(base.to_f32_vec(), vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
    }

    #[test]
    fn copy_rejects_dtype_and_numel_mismatch() {
        let dst = matrix_2x3();
        let ints = Tensor::new(TensorData::I32(vec![0; 6]), vec![2, 3]).expect("ints");
        assert!(matches!(
            dst.copy_(&ints),
            Err(TensorError::DtypeMismatch { .. })
        ));
        let short = Tensor::from_f32(vec![0.0; 4], vec![4]).expect("short");
        assert!(matches!(
            dst.copy_(&short),
            Err(TensorError::NumelMismatch { dst: 6, src: 4 })
        ));
    }

    #[test]
    fn byte_roundtrip_respects_offset() {
        let mut data = TensorData::F32(vec![0.0; 4]);
        let src = TensorData::F32(vec![7.0, 8.0]);
        data.write_bytes(1, src.bytes(0, 2)).expect("write");
        assert_eq!(data, TensorData::F32(vec![0.0, 7.0, 8.0, 0.0]));
        assert!(data.write_bytes(3, src.bytes(0, 2)).is_err());
    }

    #[test]
    fn storage_length_is_validated() {
        let err = Tensor::from_f32(vec![1.0; 5], vec![2, 3]).expect_err("bad shape");
        assert!(err.to_string().contains("needs 6 elements"));
    }
}
