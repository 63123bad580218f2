//! Tile: repeat a tensor along each axis.

use smallvec::smallvec;

use nnrt::error::{Error, Result};
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData, INDEX_TYPES};

pub struct Tile;

impl Operator for Tile {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 2 && INDEX_TYPES.contains(&inputs[1].dtype())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let repeats = inputs[1].index_data()?;
        if inputs[1].rank() != 1 || repeats.len() != x.rank() {
            return Err(Error::shape(
                "tile repeats must be a vector with one entry per input axis".to_string(),
            ));
        }

        let mut out_dims = Vec::with_capacity(x.rank());
        for (&d, &r) in x.dims().iter().zip(&repeats) {
            if r < 0 {
                return Err(Error::shape(format!("negative tile repeat {r}")));
            }
            out_dims.push(d * r as usize);
        }

        let out_len = shape::num_elements(&out_dims);
        let out_strides = shape::compute_strides(&out_dims);
        let in_strides = x.strides();
        let mut in_index: shape::Index = smallvec![0; x.rank()];
        let src = x.data();
        let mut out = TensorData::zeroed(x.dtype(), out_len);
        for i in 0..out_len {
            let out_index = shape::offset_to_indices(i, &out_strides);
            // tiling wraps each coordinate by the input extent
            shape::fill_broadcast_index(&out_index, x.dims(), &mut in_index);
            out.copy_element(i, src, shape::indices_to_offset(&in_index, &in_strides));
        }
        Ok(vec![Tensor::new(out_dims, out)?])
    }
}
