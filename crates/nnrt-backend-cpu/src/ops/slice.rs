//! Slice along a subset of axes.
//!
//! Two wire forms share the kernel: the older one carries starts, ends and
//! axes as node attributes, the newer one feeds them in as tensors (with an
//! optional steps input that must be all ones).

use nnrt::attribute::Attributes;
use nnrt::error::{Error, Result};
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData, INDEX_TYPES};

pub struct Slice {
    starts: Vec<i64>,
    ends: Vec<i64>,
    axes: Vec<i64>,
    from_attributes: bool,
}

impl Slice {
    pub fn new() -> Slice {
        Slice {
            starts: Vec::new(),
            ends: Vec::new(),
            axes: Vec::new(),
            from_attributes: false,
        }
    }
}

impl Default for Slice {
    fn default() -> Slice {
        Slice::new()
    }
}

impl Operator for Slice {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        if self.from_attributes {
            inputs.len() == 1
        } else {
            (3..=5).contains(&inputs.len())
                && inputs[1..].iter().all(|t| INDEX_TYPES.contains(&t.dtype()))
        }
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        if attrs.contains("starts") || attrs.contains("ends") {
            self.starts = attrs.get_ints("starts")?;
            self.ends = attrs.get_ints("ends")?;
            self.axes = attrs.get_ints_or("axes", Vec::new())?;
            self.from_attributes = true;
        }
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        if self.from_attributes {
            return slice_tensor(x, &self.starts, &self.ends, &self.axes);
        }
        if let Some(steps) = inputs.get(4) {
            if steps.index_data()?.iter().any(|&s| s != 1) {
                return Err(Error::shape(
                    "slice steps other than 1 are not supported".to_string(),
                ));
            }
        }
        let starts = inputs[1].index_data()?;
        let ends = inputs[2].index_data()?;
        let axes = match inputs.get(3) {
            Some(t) => t.index_data()?,
            None => Vec::new(),
        };
        slice_tensor(x, &starts, &ends, &axes)
    }
}

fn slice_tensor(x: &Tensor, starts: &[i64], ends: &[i64], axes: &[i64]) -> Result<Vec<Tensor>> {
    let rank = x.rank();
    let axes: Vec<usize> = if axes.is_empty() {
        (0..rank).collect()
    } else {
        shape::normalize_axes(axes, rank)?
    };
    if starts.len() != axes.len() || ends.len() != axes.len() {
        return Err(Error::shape(
            "slice starts, ends and axes must have matching lengths".to_string(),
        ));
    }

    let mut out_dims = x.dims().to_vec();
    let mut offsets = vec![0usize; rank];
    for (i, &axis) in axes.iter().enumerate() {
        let dim = x.dims()[axis];
        let start = clamp_bound(starts[i], dim)?;
        let end = clamp_bound(ends[i], dim)?;
        if end < start {
            return Err(Error::shape(format!(
                "slice bounds [{}, {}) produce a negative extent on axis {axis}",
                starts[i], ends[i]
            )));
        }
        offsets[axis] = start;
        out_dims[axis] = end - start;
    }

    let out_len = shape::num_elements(&out_dims);
    let out_strides = shape::compute_strides(&out_dims);
    let in_strides = x.strides();
    let src = x.data();
    let mut out = TensorData::zeroed(x.dtype(), out_len);
    for i in 0..out_len {
        let mut index = shape::offset_to_indices(i, &out_strides);
        for (pos, &offset) in index.iter_mut().zip(&offsets) {
            *pos += offset;
        }
        out.copy_element(i, src, shape::indices_to_offset(&index, &in_strides));
    }
    Ok(vec![Tensor::new(out_dims, out)?])
}

/// Positions past the end of the axis clamp to its extent; negative
/// positions wrap from the end.
fn clamp_bound(value: i64, dim: usize) -> Result<usize> {
    if value > dim as i64 - 1 {
        Ok(dim)
    } else {
        shape::normalize_axis(value, dim)
    }
}
