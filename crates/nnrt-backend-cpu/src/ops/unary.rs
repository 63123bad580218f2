//! Elementwise unary operators.
//!
//! One struct covers the whole family. The element function is fixed at
//! construction for the simple operators; the parameterized ones bind
//! their attribute values at initialization.

use nnrt::attribute::Attributes;
use nnrt::error::Result;
use nnrt::operator::Operator;
use nnrt::tensor::{DataType, Tensor, TensorData, FLOAT_TYPES};

/// Scalar function applied to every element through the f64 view.
pub type UnaryFn = fn(f64) -> f64;

enum Kernel {
    Fixed(UnaryFn),
    Clip { min: f64, max: f64 },
    Elu { alpha: f64 },
    LeakyRelu { alpha: f64 },
}

pub struct UnaryOp {
    constraint: &'static [DataType],
    kernel: Kernel,
    result_dtype: Option<DataType>,
}

impl UnaryOp {
    pub fn new(constraint: &'static [DataType], func: UnaryFn) -> UnaryOp {
        UnaryOp {
            constraint,
            kernel: Kernel::Fixed(func),
            result_dtype: None,
        }
    }

    /// For operators whose output element type differs from the input's,
    /// such as `IsNaN`.
    pub fn with_result(
        constraint: &'static [DataType],
        func: UnaryFn,
        result_dtype: DataType,
    ) -> UnaryOp {
        UnaryOp {
            constraint,
            kernel: Kernel::Fixed(func),
            result_dtype: Some(result_dtype),
        }
    }

    pub fn clip() -> UnaryOp {
        UnaryOp {
            constraint: FLOAT_TYPES,
            kernel: Kernel::Clip {
                min: f32::MIN as f64,
                max: f32::MAX as f64,
            },
            result_dtype: None,
        }
    }

    pub fn elu() -> UnaryOp {
        UnaryOp {
            constraint: FLOAT_TYPES,
            kernel: Kernel::Elu { alpha: 1.0 },
            result_dtype: None,
        }
    }

    pub fn leaky_relu() -> UnaryOp {
        UnaryOp {
            constraint: FLOAT_TYPES,
            kernel: Kernel::LeakyRelu { alpha: 0.01 },
            result_dtype: None,
        }
    }
}

impl Operator for UnaryOp {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1 && self.constraint.contains(&inputs[0].dtype())
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        match &mut self.kernel {
            Kernel::Fixed(_) => {}
            Kernel::Clip { min, max } => {
                *min = attrs.get_float_or("min", f32::MIN)? as f64;
                *max = attrs.get_float_or("max", f32::MAX)? as f64;
            }
            Kernel::Elu { alpha } => *alpha = attrs.get_float_or("alpha", 1.0)? as f64,
            Kernel::LeakyRelu { alpha } => *alpha = attrs.get_float_or("alpha", 0.01)? as f64,
        }
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let src = x.data();
        let mut out = TensorData::zeroed(self.result_dtype.unwrap_or(x.dtype()), x.len());
        match self.kernel {
            Kernel::Fixed(f) => {
                for i in 0..x.len() {
                    out.set_numeric(i, f(src.numeric(i)));
                }
            }
            Kernel::Clip { min, max } => {
                for i in 0..x.len() {
                    out.set_numeric(i, src.numeric(i).max(min).min(max));
                }
            }
            Kernel::Elu { alpha } => {
                for i in 0..x.len() {
                    let v = src.numeric(i);
                    out.set_numeric(i, if v >= 0.0 { v } else { alpha * (v.exp() - 1.0) });
                }
            }
            Kernel::LeakyRelu { alpha } => {
                for i in 0..x.len() {
                    let v = src.numeric(i);
                    out.set_numeric(i, if v >= 0.0 { v } else { alpha * v });
                }
            }
        }
        Ok(vec![Tensor::new(x.dims().to_vec(), out)?])
    }
}

// Element functions without a one-line f64 method equivalent. The rule
// table references f64 methods directly where one exists.

pub fn neg(v: f64) -> f64 {
    -v
}

pub fn reciprocal(v: f64) -> f64 {
    1.0 / v
}

pub fn relu(v: f64) -> f64 {
    v.max(0.0)
}

pub fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// Unlike `f64::signum`, zero maps to zero.
pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

pub fn is_nan(v: f64) -> f64 {
    if v.is_nan() {
        1.0
    } else {
        0.0
    }
}

pub fn not(v: f64) -> f64 {
    if v == 0.0 {
        1.0
    } else {
        0.0
    }
}
