//! Dense tensors: a row-major flat buffer plus a dimension list.
//!
//! A tensor's shape is immutable after construction and the buffer length
//! always equals the product of the dims (1 for the empty scalar shape).
//! Storage is one typed vector per element type; sharing across execution
//! steps happens above this layer, so the buffers themselves stay plainly
//! owned and mutable while a kernel builds its output.

pub mod dtype;
pub mod shape;

use serde::{Deserialize, Serialize};

pub use dtype::{DataType, BOOL_TYPES, FLOAT_TYPES, INDEX_TYPES, NUMBER_TYPES};

use crate::error::{Error, Result};

/// Typed element storage. One variant per [`DataType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TensorData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

macro_rules! per_variant {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            TensorData::I8($v) => $body,
            TensorData::I16($v) => $body,
            TensorData::I32($v) => $body,
            TensorData::I64($v) => $body,
            TensorData::U8($v) => $body,
            TensorData::U16($v) => $body,
            TensorData::U32($v) => $body,
            TensorData::U64($v) => $body,
            TensorData::F32($v) => $body,
            TensorData::F64($v) => $body,
            TensorData::Bool($v) => $body,
            TensorData::Str($v) => $body,
        }
    };
}

impl TensorData {
    pub fn dtype(&self) -> DataType {
        match self {
            TensorData::I8(_) => DataType::I8,
            TensorData::I16(_) => DataType::I16,
            TensorData::I32(_) => DataType::I32,
            TensorData::I64(_) => DataType::I64,
            TensorData::U8(_) => DataType::U8,
            TensorData::U16(_) => DataType::U16,
            TensorData::U32(_) => DataType::U32,
            TensorData::U64(_) => DataType::U64,
            TensorData::F32(_) => DataType::F32,
            TensorData::F64(_) => DataType::F64,
            TensorData::Bool(_) => DataType::Bool,
            TensorData::Str(_) => DataType::Str,
        }
    }

    pub fn len(&self) -> usize {
        per_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A zero-initialized buffer of `len` elements (empty strings for
    /// [`DataType::Str`]).
    pub fn zeroed(dtype: DataType, len: usize) -> TensorData {
        match dtype {
            DataType::I8 => TensorData::I8(vec![0; len]),
            DataType::I16 => TensorData::I16(vec![0; len]),
            DataType::I32 => TensorData::I32(vec![0; len]),
            DataType::I64 => TensorData::I64(vec![0; len]),
            DataType::U8 => TensorData::U8(vec![0; len]),
            DataType::U16 => TensorData::U16(vec![0; len]),
            DataType::U32 => TensorData::U32(vec![0; len]),
            DataType::U64 => TensorData::U64(vec![0; len]),
            DataType::F32 => TensorData::F32(vec![0.0; len]),
            DataType::F64 => TensorData::F64(vec![0.0; len]),
            DataType::Bool => TensorData::Bool(vec![false; len]),
            DataType::Str => TensorData::Str(vec![String::new(); len]),
        }
    }

    /// Copies one element from `src`. Both buffers must hold the same
    /// element type; this is an internal invariant of the copy-based
    /// kernels, violated only by a programming error.
    pub fn copy_element(&mut self, dst_idx: usize, src: &TensorData, src_idx: usize) {
        match (self, src) {
            (TensorData::I8(d), TensorData::I8(s)) => d[dst_idx] = s[src_idx],
            (TensorData::I16(d), TensorData::I16(s)) => d[dst_idx] = s[src_idx],
            (TensorData::I32(d), TensorData::I32(s)) => d[dst_idx] = s[src_idx],
            (TensorData::I64(d), TensorData::I64(s)) => d[dst_idx] = s[src_idx],
            (TensorData::U8(d), TensorData::U8(s)) => d[dst_idx] = s[src_idx],
            (TensorData::U16(d), TensorData::U16(s)) => d[dst_idx] = s[src_idx],
            (TensorData::U32(d), TensorData::U32(s)) => d[dst_idx] = s[src_idx],
            (TensorData::U64(d), TensorData::U64(s)) => d[dst_idx] = s[src_idx],
            (TensorData::F32(d), TensorData::F32(s)) => d[dst_idx] = s[src_idx],
            (TensorData::F64(d), TensorData::F64(s)) => d[dst_idx] = s[src_idx],
            (TensorData::Bool(d), TensorData::Bool(s)) => d[dst_idx] = s[src_idx],
            (TensorData::Str(d), TensorData::Str(s)) => d[dst_idx] = s[src_idx].clone(),
            (d, s) => panic!(
                "element copy between {} and {} buffers",
                d.dtype(),
                s.dtype()
            ),
        }
    }

    /// Copies `len` contiguous elements from `src`. Same element-type
    /// contract as [`TensorData::copy_element`].
    pub fn copy_range(&mut self, dst_start: usize, src: &TensorData, src_start: usize, len: usize) {
        match (self, src) {
            (TensorData::I8(d), TensorData::I8(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::I16(d), TensorData::I16(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::I32(d), TensorData::I32(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::I64(d), TensorData::I64(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::U8(d), TensorData::U8(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::U16(d), TensorData::U16(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::U32(d), TensorData::U32(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::U64(d), TensorData::U64(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::F32(d), TensorData::F32(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::F64(d), TensorData::F64(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::Bool(d), TensorData::Bool(s)) => {
                d[dst_start..dst_start + len].copy_from_slice(&s[src_start..src_start + len])
            }
            (TensorData::Str(d), TensorData::Str(s)) => {
                d[dst_start..dst_start + len].clone_from_slice(&s[src_start..src_start + len])
            }
            (d, s) => panic!(
                "range copy between {} and {} buffers",
                d.dtype(),
                s.dtype()
            ),
        }
    }

    /// Reads one element through the widest numeric type. Booleans map to
    /// 0.0/1.0. The numeric-view kernels only reach this behind a numeric
    /// type-constraint check, so a string buffer is a programming error.
    pub fn numeric(&self, idx: usize) -> f64 {
        match self {
            TensorData::I8(v) => v[idx] as f64,
            TensorData::I16(v) => v[idx] as f64,
            TensorData::I32(v) => v[idx] as f64,
            TensorData::I64(v) => v[idx] as f64,
            TensorData::U8(v) => v[idx] as f64,
            TensorData::U16(v) => v[idx] as f64,
            TensorData::U32(v) => v[idx] as f64,
            TensorData::U64(v) => v[idx] as f64,
            TensorData::F32(v) => v[idx] as f64,
            TensorData::F64(v) => v[idx],
            TensorData::Bool(v) => v[idx] as u8 as f64,
            TensorData::Str(_) => panic!("numeric access on a string buffer"),
        }
    }

    /// Writes one element through f64, truncating toward zero for integer
    /// buffers. A boolean buffer stores `value != 0.0`.
    pub fn set_numeric(&mut self, idx: usize, value: f64) {
        match self {
            TensorData::I8(v) => v[idx] = value as i8,
            TensorData::I16(v) => v[idx] = value as i16,
            TensorData::I32(v) => v[idx] = value as i32,
            TensorData::I64(v) => v[idx] = value as i64,
            TensorData::U8(v) => v[idx] = value as u8,
            TensorData::U16(v) => v[idx] = value as u16,
            TensorData::U32(v) => v[idx] = value as u32,
            TensorData::U64(v) => v[idx] = value as u64,
            TensorData::F32(v) => v[idx] = value as f32,
            TensorData::F64(v) => v[idx] = value,
            TensorData::Bool(v) => v[idx] = value != 0.0,
            TensorData::Str(_) => panic!("numeric access on a string buffer"),
        }
    }
}

/// A dense tensor value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    dims: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Builds a tensor, validating that the buffer holds exactly
    /// `product(dims)` elements.
    pub fn new(dims: Vec<usize>, data: TensorData) -> Result<Tensor> {
        let expected = shape::num_elements(&dims);
        if data.len() != expected {
            return Err(Error::shape(format!(
                "buffer of {} elements does not fill shape {:?} ({} elements)",
                data.len(),
                dims,
                expected
            )));
        }
        Ok(Tensor { dims, data })
    }

    pub fn zeros(dims: Vec<usize>, dtype: DataType) -> Tensor {
        let len = shape::num_elements(&dims);
        Tensor {
            dims,
            data: TensorData::zeroed(dtype, len),
        }
    }

    pub fn from_f32(dims: Vec<usize>, values: Vec<f32>) -> Result<Tensor> {
        Tensor::new(dims, TensorData::F32(values))
    }

    pub fn from_f64(dims: Vec<usize>, values: Vec<f64>) -> Result<Tensor> {
        Tensor::new(dims, TensorData::F64(values))
    }

    pub fn from_i32(dims: Vec<usize>, values: Vec<i32>) -> Result<Tensor> {
        Tensor::new(dims, TensorData::I32(values))
    }

    pub fn from_i64(dims: Vec<usize>, values: Vec<i64>) -> Result<Tensor> {
        Tensor::new(dims, TensorData::I64(values))
    }

    pub fn from_bool(dims: Vec<usize>, values: Vec<bool>) -> Result<Tensor> {
        Tensor::new(dims, TensorData::Bool(values))
    }

    pub fn scalar_f32(value: f32) -> Tensor {
        Tensor {
            dims: Vec::new(),
            data: TensorData::F32(vec![value]),
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut TensorData {
        &mut self.data
    }

    pub fn into_data(self) -> TensorData {
        self.data
    }

    pub fn strides(&self) -> shape::Index {
        shape::compute_strides(&self.dims)
    }

    /// The same buffer under a new shape with an equal element count.
    pub fn with_dims(self, dims: Vec<usize>) -> Result<Tensor> {
        Tensor::new(dims, self.data)
    }

    pub fn f32_data(&self) -> Result<&[f32]> {
        match &self.data {
            TensorData::F32(v) => Ok(v),
            other => Err(type_mismatch(DataType::F32, other.dtype())),
        }
    }

    pub fn f32_data_mut(&mut self) -> Result<&mut [f32]> {
        match &mut self.data {
            TensorData::F32(v) => Ok(v),
            other => Err(type_mismatch(DataType::F32, other.dtype())),
        }
    }

    pub fn i32_data(&self) -> Result<&[i32]> {
        match &self.data {
            TensorData::I32(v) => Ok(v),
            other => Err(type_mismatch(DataType::I32, other.dtype())),
        }
    }

    pub fn i64_data(&self) -> Result<&[i64]> {
        match &self.data {
            TensorData::I64(v) => Ok(v),
            other => Err(type_mismatch(DataType::I64, other.dtype())),
        }
    }

    pub fn bool_data(&self) -> Result<&[bool]> {
        match &self.data {
            TensorData::Bool(v) => Ok(v),
            other => Err(type_mismatch(DataType::Bool, other.dtype())),
        }
    }

    /// Reads an index-typed tensor (int32 or int64) into plain i64 values.
    pub fn index_data(&self) -> Result<Vec<i64>> {
        match &self.data {
            TensorData::I32(v) => Ok(v.iter().map(|&x| x as i64).collect()),
            TensorData::I64(v) => Ok(v.clone()),
            other => Err(Error::shape(format!(
                "expected int32 or int64 tensor data, found {}",
                other.dtype()
            ))),
        }
    }
}

fn type_mismatch(expected: DataType, found: DataType) -> Error {
    Error::shape(format!("expected {expected} tensor data, found {found}"))
}
