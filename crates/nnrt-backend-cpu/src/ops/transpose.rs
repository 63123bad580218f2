//! Transpose.
//!
//! The permutation is split into a prefix and the longest trailing run it
//! leaves in place. Everything inside the untouched suffix stays contiguous
//! in both layouts, which picks one of three strategies: a single block
//! copy when the prefix is empty, an element-per-element walk when the
//! suffix is empty, and a block copy per prefix position otherwise.

use smallvec::smallvec;

use nnrt::attribute::Attributes;
use nnrt::error::Result;
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData};

pub struct Transpose {
    perm: Vec<i64>,
}

impl Transpose {
    pub fn new() -> Transpose {
        Transpose { perm: Vec::new() }
    }
}

impl Default for Transpose {
    fn default() -> Transpose {
        Transpose::new()
    }
}

impl Operator for Transpose {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.perm = attrs.get_ints_or("perm", Vec::new())?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let rank = x.rank();
        let in_dims = x.dims();
        let perm: Vec<usize> = if self.perm.is_empty() {
            (0..rank).rev().collect()
        } else {
            shape::normalize_axes(&self.perm, rank)?
        };
        let out_dims = shape::permute_dims(in_dims, &perm)?;

        // stride[i]: input stride of the dimension feeding output axis i
        let stride: Vec<usize> = perm
            .iter()
            .map(|&p| shape::size_from_dimension(in_dims, p + 1))
            .collect();

        let mut num_prefix_axes = 0;
        let mut prefix_block = 1usize;
        let mut suffix_block = 1usize;
        let mut in_suffix = true;
        for i in (0..rank).rev() {
            if in_suffix && perm[i] == i {
                suffix_block *= in_dims[i];
            } else {
                in_suffix = false;
                prefix_block *= in_dims[perm[i]];
                num_prefix_axes += 1;
            }
        }

        let src = x.data();
        let mut out = TensorData::zeroed(x.dtype(), x.len());
        if prefix_block == 1 {
            // the permutation leaves the layout untouched
            out.copy_range(0, src, 0, suffix_block);
        } else if suffix_block == 1 {
            let mut index: shape::Index = smallvec![0; rank];
            for dst in 0..prefix_block {
                let src_offset =
                    shape::indices_to_offset(&index[..num_prefix_axes], &stride[..num_prefix_axes]);
                out.copy_element(dst, src, src_offset);
                shape::increment_index(&mut index, &out_dims, num_prefix_axes);
            }
        } else {
            let mut index: shape::Index = smallvec![0; rank];
            let mut dst = 0;
            for _ in 0..prefix_block {
                let src_offset =
                    shape::indices_to_offset(&index[..num_prefix_axes], &stride[..num_prefix_axes]);
                out.copy_range(dst, src, src_offset, suffix_block);
                shape::increment_index(&mut index, &out_dims, num_prefix_axes);
                dst += suffix_block;
            }
        }
        Ok(vec![Tensor::new(out_dims, out)?])
    }
}
