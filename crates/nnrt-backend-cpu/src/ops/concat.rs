//! Concatenation along one axis.

use nnrt::attribute::Attributes;
use nnrt::error::{Error, Result};
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData};

pub struct Concat {
    axis: i64,
}

impl Concat {
    pub fn new() -> Concat {
        Concat { axis: 0 }
    }
}

impl Default for Concat {
    fn default() -> Concat {
        Concat::new()
    }
}

impl Operator for Concat {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        !inputs.is_empty() && inputs.iter().all(|t| t.dtype() == inputs[0].dtype())
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.axis = attrs.get_int("axis")?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let first = inputs[0];
        let rank = first.rank();
        let axis = shape::normalize_axis(self.axis, rank)?;

        let mut concat_size = 0usize;
        for t in inputs {
            if t.rank() != rank {
                return Err(Error::shape(format!(
                    "cannot concatenate rank {} and rank {rank} tensors",
                    t.rank()
                )));
            }
            for (i, (&a, &b)) in first.dims().iter().zip(t.dims()).enumerate() {
                if i != axis && a != b {
                    return Err(Error::shape(format!(
                        "non-concat dimension {i} differs: {a} vs {b}"
                    )));
                }
            }
            concat_size += t.dims()[axis];
        }
        let mut out_dims = first.dims().to_vec();
        out_dims[axis] = concat_size;

        // elements jumped over when the concat axis advances by one full
        // extent in the output
        let axis_pitch = shape::size_from_dimension(&out_dims, axis);
        let out_len = shape::num_elements(&out_dims);
        let mut out = TensorData::zeroed(first.dtype(), out_len);

        let mut output_base = 0usize;
        for t in inputs {
            let input_axis_pitch = shape::size_from_dimension(t.dims(), axis);
            let input_len = t.len();

            // each contiguous run of input_axis_pitch elements lands one
            // output axis-pitch apart
            let mut copied = 0;
            let mut output_offset = output_base;
            while copied < input_len {
                out.copy_range(output_offset, t.data(), copied, input_axis_pitch);
                copied += input_axis_pitch;
                output_offset += axis_pitch;
            }
            output_base += input_axis_pitch;
        }
        Ok(vec![Tensor::new(out_dims, out)?])
    }
}
