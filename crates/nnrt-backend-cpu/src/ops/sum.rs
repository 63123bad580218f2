//! Variadic elementwise sum over same-shaped inputs.

use nnrt::error::Result;
use nnrt::operator::Operator;
use nnrt::tensor::{Tensor, TensorData, FLOAT_TYPES};

pub struct Sum;

impl Operator for Sum {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        if inputs.is_empty() {
            return false;
        }
        let first = inputs[0];
        FLOAT_TYPES.contains(&first.dtype())
            && inputs
                .iter()
                .all(|t| t.dtype() == first.dtype() && t.dims() == first.dims())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let first = inputs[0];
        let mut acc = vec![0.0f64; first.len()];
        for t in inputs {
            let data = t.data();
            for (i, slot) in acc.iter_mut().enumerate() {
                *slot += data.numeric(i);
            }
        }
        let mut out = TensorData::zeroed(first.dtype(), first.len());
        for (i, &v) in acc.iter().enumerate() {
            out.set_numeric(i, v);
        }
        Ok(vec![Tensor::new(first.dims().to_vec(), out)?])
    }
}
