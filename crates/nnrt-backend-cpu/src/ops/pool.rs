//! Window pooling operators: average and max, windowed and global.

use nnrt::attribute::Attributes;
use nnrt::error::Result;
use nnrt::operator::Operator;
use nnrt::tensor::shape::{self, AutoPad};
use nnrt::tensor::{Tensor, TensorData, FLOAT_TYPES};

use super::usize_list;

#[derive(Clone, Copy, PartialEq, Eq)]
enum PoolKind {
    Average,
    Max,
}

pub struct Pool {
    kind: PoolKind,
    is_global: bool,
    auto_pad: AutoPad,
    count_include_pad: bool,
    kernel_shape: Vec<usize>,
    strides: Vec<usize>,
    pads: Vec<usize>,
}

impl Pool {
    fn with_kind(kind: PoolKind, is_global: bool) -> Pool {
        Pool {
            kind,
            is_global,
            auto_pad: AutoPad::NotSet,
            count_include_pad: false,
            kernel_shape: Vec::new(),
            strides: Vec::new(),
            pads: Vec::new(),
        }
    }

    pub fn average() -> Pool {
        Pool::with_kind(PoolKind::Average, false)
    }

    pub fn global_average() -> Pool {
        Pool::with_kind(PoolKind::Average, true)
    }

    pub fn max() -> Pool {
        Pool::with_kind(PoolKind::Max, false)
    }

    pub fn global_max() -> Pool {
        Pool::with_kind(PoolKind::Max, true)
    }
}

impl Operator for Pool {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1 && FLOAT_TYPES.contains(&inputs[0].dtype())
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        // a global pool takes its kernel from the input at run time and
        // carries no window attributes
        if !self.is_global {
            self.auto_pad = AutoPad::parse(&attrs.get_string_or("auto_pad", String::new())?)?;
            self.kernel_shape = usize_list(&attrs.get_ints("kernel_shape")?, "kernel_shape")?;
            self.strides = usize_list(&attrs.get_ints_or("strides", Vec::new())?, "strides")?;
            self.pads = usize_list(&attrs.get_ints_or("pads", Vec::new())?, "pads")?;
            if self.kind == PoolKind::Average {
                self.count_include_pad = attrs.get_int_or("count_include_pad", 0)? != 0;
            }
        }
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let mut kernel_shape = self.kernel_shape.clone();
        let mut strides = self.strides.clone();
        let mut pads = self.pads.clone();
        shape::adjust_pool_attributes(
            self.is_global,
            x.dims(),
            &mut kernel_shape,
            &mut strides,
            &mut pads,
        )?;
        let out_dims = shape::compute_pool_output_dims(
            x.dims(),
            &kernel_shape,
            &strides,
            &mut pads,
            self.auto_pad,
        )?;

        let rank = out_dims.len();
        let spatial_rank = kernel_shape.len();
        let kernel_size = shape::num_elements(&kernel_shape);
        let kernel_strides = shape::compute_strides(&kernel_shape);
        let in_dims = x.dims();
        let in_strides = x.strides();
        let out_len = shape::num_elements(&out_dims);
        let out_strides = shape::compute_strides(&out_dims);
        let src = x.data();
        let mut out = TensorData::zeroed(x.dtype(), out_len);

        for i in 0..out_len {
            let out_index = shape::offset_to_indices(i, &out_strides);
            let mut x_index = out_index.clone();
            let mut acc = match self.kind {
                PoolKind::Average => 0.0,
                PoolKind::Max => f64::NEG_INFINITY,
            };
            let mut pad_hits = 0usize;
            for k in 0..kernel_size {
                let offsets = shape::offset_to_indices(k, &kernel_strides);
                let mut inside = true;
                for j in 0..spatial_rank {
                    let axis = rank - spatial_rank + j;
                    let pos =
                        (out_index[axis] * strides[j] + offsets[j]) as isize - pads[j] as isize;
                    if pos < 0 || pos >= in_dims[axis] as isize {
                        inside = false;
                        pad_hits += 1;
                        break;
                    }
                    x_index[axis] = pos as usize;
                }
                if inside {
                    let v = src.numeric(shape::indices_to_offset(&x_index, &in_strides));
                    acc = match self.kind {
                        PoolKind::Average => acc + v,
                        PoolKind::Max => acc.max(v),
                    };
                }
            }
            let value = match self.kind {
                PoolKind::Max => acc,
                PoolKind::Average => {
                    let divisor = if self.count_include_pad {
                        kernel_size
                    } else {
                        kernel_size - pad_hits
                    };
                    acc / divisor as f64
                }
            };
            out.set_numeric(i, value);
        }
        Ok(vec![Tensor::new(out_dims, out)?])
    }
}
