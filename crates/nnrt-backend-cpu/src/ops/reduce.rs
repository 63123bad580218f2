//! The reduction operator family.
//!
//! Every variant is a per-element map, an associative combine over the
//! reduced axes and an optional whole-output post pass (the mean's divide,
//! the log-sum's logarithm). An empty axis list reduces everything.

use smallvec::smallvec;

use nnrt::attribute::Attributes;
use nnrt::error::Result;
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData, NUMBER_TYPES};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceKind {
    Sum,
    SumSquare,
    LogSum,
    Mean,
    Prod,
    Max,
    Min,
}

pub struct ReduceOp {
    kind: ReduceKind,
    axes: Vec<i64>,
    keep_dims: bool,
}

impl ReduceOp {
    pub fn new(kind: ReduceKind) -> ReduceOp {
        ReduceOp {
            kind,
            axes: Vec::new(),
            keep_dims: true,
        }
    }
}

impl Operator for ReduceOp {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1 && NUMBER_TYPES.contains(&inputs[0].dtype())
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.axes = attrs.get_ints_or("axes", Vec::new())?;
        self.keep_dims = attrs.get_int_or("keepdims", 1)? != 0;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let rank = x.rank();
        let mut axes = if self.axes.is_empty() {
            (0..rank).collect::<Vec<_>>()
        } else {
            shape::normalize_axes(&self.axes, rank)?
        };
        axes.sort_unstable();
        axes.dedup();

        let in_dims = x.dims();
        let kept_dims: Vec<usize> = in_dims
            .iter()
            .enumerate()
            .map(|(i, &d)| if axes.binary_search(&i).is_ok() { 1 } else { d })
            .collect();

        let (map, combine): (fn(f64) -> f64, fn(f64, f64) -> f64) = match self.kind {
            ReduceKind::Sum | ReduceKind::Mean | ReduceKind::LogSum => (|v| v, |a, b| a + b),
            ReduceKind::SumSquare => (|v| v * v, |a, b| a + b),
            ReduceKind::Prod => (|v| v, |a, b| a * b),
            ReduceKind::Max => (|v| v, f64::max),
            ReduceKind::Min => (|v| v, f64::min),
        };

        let in_strides = x.strides();
        let out_len = shape::num_elements(&kept_dims);
        let out_strides = shape::compute_strides(&kept_dims);
        let red_dims: Vec<usize> = axes.iter().map(|&a| in_dims[a]).collect();
        let red_count = shape::num_elements(&red_dims);
        let src = x.data();
        let mut out = TensorData::zeroed(x.dtype(), out_len);

        for i in 0..out_len {
            // reduced positions of the kept-dims index are already zero
            let mut in_index = shape::offset_to_indices(i, &out_strides);
            let mut red_index: shape::Index = smallvec![0; red_dims.len()];
            let mut acc = 0.0;
            for step in 0..red_count {
                for (k, &axis) in axes.iter().enumerate() {
                    in_index[axis] = red_index[k];
                }
                let v = map(src.numeric(shape::indices_to_offset(&in_index, &in_strides)));
                acc = if step == 0 { v } else { combine(acc, v) };
                shape::increment_index(&mut red_index, &red_dims, red_dims.len());
            }
            out.set_numeric(i, acc);
        }

        match self.kind {
            ReduceKind::Mean => {
                let scale = red_count as f64;
                for i in 0..out_len {
                    out.set_numeric(i, out.numeric(i) / scale);
                }
            }
            ReduceKind::LogSum => {
                for i in 0..out_len {
                    out.set_numeric(i, out.numeric(i).ln());
                }
            }
            _ => {}
        }

        let final_dims: Vec<usize> = if self.keep_dims {
            kept_dims
        } else {
            in_dims
                .iter()
                .enumerate()
                .filter(|(i, _)| axes.binary_search(i).is_err())
                .map(|(_, &d)| d)
                .collect()
        };
        Ok(vec![Tensor::new(final_dims, out)?])
    }
}
