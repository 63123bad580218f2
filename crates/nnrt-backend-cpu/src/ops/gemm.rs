//! General matrix multiply.

use smallvec::smallvec;

use nnrt::attribute::Attributes;
use nnrt::error::{Error, Result};
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData, FLOAT_TYPES};

use super::numeric_vec;

/// `y = alpha * op(a) . op(b) + beta * y` over row-major f64 buffers, with
/// one specialized loop nest per transpose combination so the index
/// arithmetic stays out of the innermost loop. Only the first `m * n`
/// elements of `y` are touched; `a` and `b` may extend past the operand
/// (batched callers pass suffixes of a larger buffer).
#[allow(clippy::too_many_arguments)]
pub(crate) fn gemm_2d(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    b: &[f64],
    beta: f64,
    y: &mut [f64],
) {
    if beta == 0.0 {
        y[..m * n].fill(0.0);
    } else if beta != 1.0 {
        for v in &mut y[..m * n] {
            *v *= beta;
        }
    }
    match (trans_a, trans_b) {
        (false, false) => {
            for i in 0..m {
                for j in 0..n {
                    let mut sum = 0.0;
                    for l in 0..k {
                        sum += a[i * k + l] * b[l * n + j];
                    }
                    y[i * n + j] += alpha * sum;
                }
            }
        }
        (true, false) => {
            for i in 0..m {
                for j in 0..n {
                    let mut sum = 0.0;
                    for l in 0..k {
                        sum += a[l * m + i] * b[l * n + j];
                    }
                    y[i * n + j] += alpha * sum;
                }
            }
        }
        (false, true) => {
            for i in 0..m {
                for j in 0..n {
                    let mut sum = 0.0;
                    for l in 0..k {
                        sum += a[i * k + l] * b[j * k + l];
                    }
                    y[i * n + j] += alpha * sum;
                }
            }
        }
        (true, true) => {
            for i in 0..m {
                for j in 0..n {
                    let mut sum = 0.0;
                    for l in 0..k {
                        sum += a[l * m + i] * b[j * k + l];
                    }
                    y[i * n + j] += alpha * sum;
                }
            }
        }
    }
}

/// `Y = alpha * op(A) . op(B) + beta * C`, C optional and broadcast to
/// `[M, N]`. The bias is added into a fresh output, never in place.
pub struct Gemm {
    alpha: f64,
    beta: f64,
    trans_a: bool,
    trans_b: bool,
}

impl Gemm {
    pub fn new() -> Gemm {
        Gemm {
            alpha: 1.0,
            beta: 1.0,
            trans_a: false,
            trans_b: false,
        }
    }
}

impl Default for Gemm {
    fn default() -> Gemm {
        Gemm::new()
    }
}

impl Operator for Gemm {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        if !(2..=3).contains(&inputs.len()) {
            return false;
        }
        let dtype = inputs[0].dtype();
        FLOAT_TYPES.contains(&dtype)
            && inputs.iter().all(|t| t.dtype() == dtype)
            && inputs[0].rank() == 2
            && inputs[1].rank() == 2
            && inputs.get(2).map_or(true, |c| c.rank() <= 2)
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.alpha = attrs.get_float_or("alpha", 1.0)? as f64;
        self.beta = attrs.get_float_or("beta", 1.0)? as f64;
        self.trans_a = attrs.get_int_or("transA", 0)? != 0;
        self.trans_b = attrs.get_int_or("transB", 0)? != 0;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let a = inputs[0];
        let b = inputs[1];
        let (m, ka) = if self.trans_a {
            (a.dims()[1], a.dims()[0])
        } else {
            (a.dims()[0], a.dims()[1])
        };
        let (kb, n) = if self.trans_b {
            (b.dims()[1], b.dims()[0])
        } else {
            (b.dims()[0], b.dims()[1])
        };
        if ka != kb {
            return Err(Error::shape(format!(
                "contraction dimension mismatch: {ka} vs {kb}"
            )));
        }

        let a_values = numeric_vec(a);
        let b_values = numeric_vec(b);
        let mut y = vec![0.0f64; m * n];
        gemm_2d(
            self.trans_a,
            self.trans_b,
            m,
            n,
            ka,
            self.alpha,
            &a_values,
            &b_values,
            0.0,
            &mut y,
        );

        let mut out = TensorData::zeroed(a.dtype(), m * n);
        match inputs.get(2) {
            Some(c) => {
                let broadcast = shape::broadcast_shape(c.dims(), &[m, n])?;
                if broadcast != [m, n] {
                    return Err(Error::shape(format!(
                        "bias shape {:?} does not broadcast to [{m}, {n}]",
                        c.dims()
                    )));
                }
                let c_data = c.data();
                let c_strides = c.strides();
                let mut c_index: shape::Index = smallvec![0; c.rank()];
                for i in 0..m * n {
                    let out_index = [i / n, i % n];
                    shape::fill_broadcast_index(&out_index, c.dims(), &mut c_index);
                    let bias = c_data.numeric(shape::indices_to_offset(&c_index, &c_strides));
                    out.set_numeric(i, y[i] + self.beta * bias);
                }
            }
            None => {
                for (i, &v) in y.iter().enumerate() {
                    out.set_numeric(i, v);
                }
            }
        }
        Ok(vec![Tensor::new(vec![m, n], out)?])
    }
}
