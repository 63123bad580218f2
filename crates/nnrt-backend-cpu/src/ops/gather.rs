//! Gather along one axis.

use nnrt::attribute::Attributes;
use nnrt::error::{Error, Result};
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData, INDEX_TYPES};

pub struct Gather {
    axis: i64,
}

impl Gather {
    pub fn new() -> Gather {
        Gather { axis: 0 }
    }
}

impl Default for Gather {
    fn default() -> Gather {
        Gather::new()
    }
}

impl Operator for Gather {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 2 && INDEX_TYPES.contains(&inputs[1].dtype())
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.axis = attrs.get_int_or("axis", 0)?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let idx = inputs[1];
        let rank = x.rank();
        let axis = shape::normalize_axis(self.axis, rank)?;
        let indices = idx.index_data()?;
        let axis_dim = x.dims()[axis];

        // working shape: the gathered axis runs over the flat index list;
        // the indices tensor's own shape splices in afterwards
        let mut work_dims = x.dims().to_vec();
        work_dims[axis] = indices.len();
        let out_len = shape::num_elements(&work_dims);
        let work_strides = shape::compute_strides(&work_dims);
        let in_strides = x.strides();
        let src = x.data();
        let mut out = TensorData::zeroed(x.dtype(), out_len);

        for i in 0..out_len {
            let mut index = shape::offset_to_indices(i, &work_strides);
            let pos = indices[index[axis]];
            let wrapped = if pos < 0 { pos + axis_dim as i64 } else { pos };
            if wrapped < 0 || wrapped >= axis_dim as i64 {
                return Err(Error::shape(format!(
                    "gather index {pos} is out of range for an axis of size {axis_dim}"
                )));
            }
            index[axis] = wrapped as usize;
            out.copy_element(i, src, shape::indices_to_offset(&index, &in_strides));
        }

        let mut out_dims = x.dims()[..axis].to_vec();
        out_dims.extend_from_slice(idx.dims());
        out_dims.extend_from_slice(&x.dims()[axis + 1..]);
        Ok(vec![Tensor::new(out_dims, out)?])
    }
}
