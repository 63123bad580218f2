//! The CPU operator kernels.
//!
//! Heavy kernels (matrix multiply, convolution, pooling, reductions,
//! softmax) compute through widened f64 scratch buffers and narrow once
//! into the output's element type. Copy-based kernels (transpose, concat,
//! slice, gather, tile) move elements of any type without interpreting
//! them.

pub mod binary;
pub mod concat;
pub mod conv;
pub mod gather;
pub mod gemm;
pub mod matmul;
pub mod pool;
pub mod reduce;
pub mod shape_ops;
pub mod slice;
pub mod softmax;
pub mod sum;
pub mod tile;
pub mod transpose;
pub mod unary;

use nnrt::error::{Error, Result};
use nnrt::tensor::Tensor;

/// Widens a numeric tensor into a contiguous f64 scratch buffer.
pub(crate) fn numeric_vec(t: &Tensor) -> Vec<f64> {
    let data = t.data();
    (0..data.len()).map(|i| data.numeric(i)).collect()
}

/// Converts an integer list attribute into usize values, rejecting
/// negatives.
pub(crate) fn usize_list(values: &[i64], name: &str) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|&v| {
            usize::try_from(v).map_err(|_| {
                Error::configuration(format!("attribute '{name}' holds a negative value {v}"))
            })
        })
        .collect()
}
