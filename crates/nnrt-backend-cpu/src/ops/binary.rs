//! Elementwise binary operators with numpy-style broadcasting.

use smallvec::smallvec;

use nnrt::attribute::Attributes;
use nnrt::error::{Error, Result};
use nnrt::operator::Operator;
use nnrt::tensor::{shape, DataType, Tensor, TensorData};

/// Scalar combining function applied through the f64 view.
pub type BinaryFn = fn(f64, f64) -> f64;

pub struct BinaryOp {
    constraint: &'static [DataType],
    func: Option<BinaryFn>,
    op_name: Option<&'static str>,
}

impl BinaryOp {
    pub fn new(constraint: &'static [DataType], func: BinaryFn) -> BinaryOp {
        BinaryOp {
            constraint,
            func: Some(func),
            op_name: None,
        }
    }

    /// Defers to a built-in combining function looked up by operator name
    /// when attributes are bound. An unknown name fails initialization, not
    /// the first run.
    pub fn named(constraint: &'static [DataType], op_name: &'static str) -> BinaryOp {
        BinaryOp {
            constraint,
            func: None,
            op_name: Some(op_name),
        }
    }
}

fn builtin(op_name: &str) -> Option<BinaryFn> {
    match op_name {
        "Add" => Some(add),
        "Sub" => Some(sub),
        "Mul" => Some(mul),
        "Div" => Some(div),
        _ => None,
    }
}

impl Operator for BinaryOp {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 2
            && inputs[0].dtype() == inputs[1].dtype()
            && self.constraint.contains(&inputs[0].dtype())
    }

    fn initialize(&mut self, _attrs: &Attributes) -> Result<()> {
        if self.func.is_none() {
            self.func = self.op_name.and_then(builtin);
        }
        if self.func.is_none() {
            let name = self.op_name.unwrap_or_default();
            return Err(Error::configuration(format!(
                "no built-in combining function for operator '{name}'"
            )));
        }
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let f = self
            .func
            .ok_or_else(|| Error::configuration("binary operator was never initialized"))?;
        let a = inputs[0];
        let b = inputs[1];
        let a_data = a.data();
        let b_data = b.data();
        let a_strides = a.strides();
        let b_strides = b.strides();
        let mut a_index: shape::Index = smallvec![0; a.rank()];
        let mut b_index: shape::Index = smallvec![0; b.rank()];

        let out_dims = shape::broadcast_shape(a.dims(), b.dims())?;
        let out_len = shape::num_elements(&out_dims);
        let out_strides = shape::compute_strides(&out_dims);
        let mut out = TensorData::zeroed(a.dtype(), out_len);
        for i in 0..out_len {
            let out_index = shape::offset_to_indices(i, &out_strides);
            shape::fill_broadcast_index(&out_index, a.dims(), &mut a_index);
            shape::fill_broadcast_index(&out_index, b.dims(), &mut b_index);
            let lhs = a_data.numeric(shape::indices_to_offset(&a_index, &a_strides));
            let rhs = b_data.numeric(shape::indices_to_offset(&b_index, &b_strides));
            out.set_numeric(i, f(lhs, rhs));
        }
        Ok(vec![Tensor::new(out_dims, out)?])
    }
}

// Named combining functions, mirroring the unary module.

pub fn add(a: f64, b: f64) -> f64 {
    a + b
}

pub fn sub(a: f64, b: f64) -> f64 {
    a - b
}

pub fn mul(a: f64, b: f64) -> f64 {
    a * b
}

pub fn div(a: f64, b: f64) -> f64 {
    a / b
}

pub fn prelu(a: f64, b: f64) -> f64 {
    if a >= 0.0 {
        a
    } else {
        a * b
    }
}

pub fn logical_and(a: f64, b: f64) -> f64 {
    if a != 0.0 && b != 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn logical_or(a: f64, b: f64) -> f64 {
    if a != 0.0 || b != 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn logical_xor(a: f64, b: f64) -> f64 {
    if (a != 0.0) != (b != 0.0) {
        1.0
    } else {
        0.0
    }
}
