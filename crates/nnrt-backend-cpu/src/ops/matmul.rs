//! Batched matrix multiply with broadcast leading dimensions.

use smallvec::smallvec;

use nnrt::error::Result;
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, TensorData, FLOAT_TYPES};

use super::gemm::gemm_2d;
use super::numeric_vec;

pub struct MatMul;

impl Operator for MatMul {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 2
            && inputs[0].dtype() == inputs[1].dtype()
            && FLOAT_TYPES.contains(&inputs[0].dtype())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let a = inputs[0];
        let b = inputs[1];

        // rank-1 operands borrow a unit dimension for the multiply; it is
        // dropped from the output shape afterwards
        let a_vec = a.rank() == 1;
        let b_vec = b.rank() == 1;
        let mut a_dims = a.dims().to_vec();
        let mut b_dims = b.dims().to_vec();
        if a_vec {
            a_dims.insert(0, 1);
        }
        if b_vec {
            b_dims.push(1);
        }

        let full_dims = shape::broadcast_matmul_shape(&a_dims, &b_dims)?;
        let crank = full_dims.len();
        let m = full_dims[crank - 2];
        let n = full_dims[crank - 1];
        let k = a_dims[a_dims.len() - 1];

        let a_values = numeric_vec(a);
        let b_values = numeric_vec(b);
        let out_len = shape::num_elements(&full_dims);
        let mut y = vec![0.0f64; out_len];

        let batch_dims = &full_dims[..crank - 2];
        let batch_strides = shape::compute_strides(batch_dims);
        let a_lead = a_dims.len() - 2;
        let b_lead = b_dims.len() - 2;
        let a_strides = shape::compute_strides(&a_dims);
        let b_strides = shape::compute_strides(&b_dims);
        let mut a_index: shape::Index = smallvec![0; a_lead];
        let mut b_index: shape::Index = smallvec![0; b_lead];

        for batch in 0..shape::num_elements(batch_dims) {
            let batch_index = shape::offset_to_indices(batch, &batch_strides);
            shape::fill_broadcast_index(&batch_index, &a_dims[..a_lead], &mut a_index);
            shape::fill_broadcast_index(&batch_index, &b_dims[..b_lead], &mut b_index);
            let a_base = shape::indices_to_offset(&a_index, &a_strides[..a_lead]);
            let b_base = shape::indices_to_offset(&b_index, &b_strides[..b_lead]);
            let y_base = batch * m * n;
            gemm_2d(
                false,
                false,
                m,
                n,
                k,
                1.0,
                &a_values[a_base..],
                &b_values[b_base..],
                0.0,
                &mut y[y_base..y_base + m * n],
            );
        }

        let mut out_dims = full_dims;
        if b_vec {
            out_dims.truncate(crank - 1);
        }
        if a_vec {
            out_dims.remove(out_dims.len() - if b_vec { 1 } else { 2 });
        }

        let mut out = TensorData::zeroed(a.dtype(), out_len);
        for (i, &v) in y.iter().enumerate() {
            out.set_numeric(i, v);
        }
        Ok(vec![Tensor::new(out_dims, out)?])
    }
}
