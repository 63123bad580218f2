//! Softmax over the trailing dimensions.

use nnrt::attribute::Attributes;
use nnrt::error::Result;
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData, FLOAT_TYPES};

/// The input is viewed as a `[rows, cols]` matrix split at `axis`, and each
/// row is normalized independently. Exponentials are shifted by the row
/// maximum; a row summing to zero yields zeros instead of dividing by it.
pub struct Softmax {
    axis: i64,
}

impl Softmax {
    pub fn new() -> Softmax {
        Softmax { axis: 1 }
    }
}

impl Default for Softmax {
    fn default() -> Softmax {
        Softmax::new()
    }
}

impl Operator for Softmax {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1 && FLOAT_TYPES.contains(&inputs[0].dtype())
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.axis = attrs.get_int_or("axis", 1)?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let axis = shape::normalize_axis(self.axis, x.rank())?;
        let rows = shape::size_to_dimension(x.dims(), axis);
        let cols = shape::size_from_dimension(x.dims(), axis);

        let src = x.data();
        let mut out = TensorData::zeroed(x.dtype(), x.len());
        for row in 0..rows {
            let base = row * cols;
            let mut max = f64::NEG_INFINITY;
            for j in 0..cols {
                max = max.max(src.numeric(base + j));
            }
            let mut scale = 0.0;
            for j in 0..cols {
                let e = (src.numeric(base + j) - max).exp();
                out.set_numeric(base + j, e);
                scale += e;
            }
            for j in 0..cols {
                let v = if scale == 0.0 {
                    0.0
                } else {
                    out.numeric(base + j) / scale
                };
                out.set_numeric(base + j, v);
            }
        }
        Ok(vec![Tensor::new(x.dims().to_vec(), out)?])
    }
}
