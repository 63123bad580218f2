use nnrt::attribute::Attributes;
use nnrt::operator::Operator;
use nnrt::tensor::{DataType, Tensor};
use nnrt_backend_cpu::ops::concat::Concat;
use nnrt_backend_cpu::ops::gather::Gather;
use nnrt_backend_cpu::ops::shape_ops::{
    Dropout, Flatten, Identity, Reshape, Shape, Squeeze, Unsqueeze,
};
use nnrt_backend_cpu::ops::slice::Slice;
use nnrt_backend_cpu::ops::tile::Tile;
use nnrt_backend_cpu::ops::transpose::Transpose;

fn tensor(dims: &[usize], values: &[f32]) -> Tensor {
    Tensor::from_f32(dims.to_vec(), values.to_vec()).expect("tensor literal")
}

fn run_op(op: &dyn Operator, inputs: &[&Tensor]) -> Tensor {
    assert!(op.check_inputs(inputs), "operator rejected its inputs");
    let mut outputs = op.run(inputs).expect("kernel run");
    assert_eq!(outputs.len(), 1);
    outputs.remove(0)
}

fn assert_f32_tensor(actual: &Tensor, dims: &[usize], expected: &[f32]) {
    assert_eq!(actual.dims(), dims);
    let data = actual.f32_data().expect("f32 output");
    assert_eq!(data.len(), expected.len());
    for (i, (a, b)) in data.iter().zip(expected).enumerate() {
        assert!((a - b).abs() < 1e-6, "element {i}: {a} vs {b}");
    }
}

#[test]
fn the_default_transpose_reverses_the_axes() {
    let x = tensor(&[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let mut op = Transpose::new();
    op.initialize(&Attributes::new()).unwrap();
    assert_f32_tensor(&run_op(&op, &[&x]), &[3, 2], &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
}

#[test]
fn permutations_with_a_fixed_suffix_block_copy() {
    // swapping the two leading axes leaves the last axis contiguous
    let x = tensor(&[2, 2, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    let mut attrs = Attributes::new();
    attrs.set("perm", vec![1i64, 0, 2]).unwrap();
    let mut op = Transpose::new();
    op.initialize(&attrs).unwrap();
    assert_f32_tensor(
        &run_op(&op, &[&x]),
        &[2, 2, 2],
        &[1.0, 2.0, 5.0, 6.0, 3.0, 4.0, 7.0, 8.0],
    );
}

#[test]
fn identity_permutations_copy_straight_through() {
    let x = tensor(&[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let mut attrs = Attributes::new();
    attrs.set("perm", vec![0i64, 1]).unwrap();
    let mut op = Transpose::new();
    op.initialize(&attrs).unwrap();
    assert_f32_tensor(
        &run_op(&op, &[&x]),
        &[2, 3],
        &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    );
}

#[test]
fn transposing_twice_with_the_inverse_is_the_identity() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(17);
    let values: Vec<f32> = (0..24).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let x = Tensor::from_f32(vec![2, 3, 4], values.clone()).unwrap();

    let mut fwd_attrs = Attributes::new();
    fwd_attrs.set("perm", vec![2i64, 0, 1]).unwrap();
    let mut fwd = Transpose::new();
    fwd.initialize(&fwd_attrs).unwrap();

    let mut inv_attrs = Attributes::new();
    inv_attrs.set("perm", vec![1i64, 2, 0]).unwrap();
    let mut inv = Transpose::new();
    inv.initialize(&inv_attrs).unwrap();

    let round_trip = run_op(&inv, &[&run_op(&fwd, &[&x])]);
    assert_f32_tensor(&round_trip, &[2, 3, 4], &values);
}

#[test]
fn reshape_follows_the_requested_dims() {
    let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
    let x = tensor(&[2, 6], &values);
    let request = Tensor::from_i64(vec![3], vec![3, -1, 2]).unwrap();
    let y = run_op(&Reshape, &[&x, &request]);
    assert_eq!(y.dims(), [3, 2, 2]);
    assert_eq!(&y.f32_data().unwrap()[..4], [0.0, 1.0, 2.0, 3.0]);

    let back = Tensor::from_i64(vec![2], vec![2, 6]).unwrap();
    let restored = run_op(&Reshape, &[&y, &back]);
    assert_eq!(restored, x);
}

#[test]
fn reshape_accepts_int32_shape_inputs() {
    let x = tensor(&[4], &[1.0, 2.0, 3.0, 4.0]);
    let request = Tensor::from_i32(vec![2], vec![2, 2]).unwrap();
    assert_eq!(run_op(&Reshape, &[&x, &request]).dims(), [2, 2]);
}

#[test]
fn flatten_splits_at_the_axis() {
    let x = tensor(&[2, 3, 4], &[0.0; 24]);

    let mut op = Flatten::new();
    op.initialize(&Attributes::new()).unwrap();
    assert_eq!(run_op(&op, &[&x]).dims(), [2, 12]);

    let mut attrs = Attributes::new();
    attrs.set("axis", 0i64).unwrap();
    let mut op = Flatten::new();
    op.initialize(&attrs).unwrap();
    assert_eq!(run_op(&op, &[&x]).dims(), [1, 24]);

    let mut attrs = Attributes::new();
    attrs.set("axis", 3i64).unwrap();
    let mut op = Flatten::new();
    op.initialize(&attrs).unwrap();
    assert_eq!(run_op(&op, &[&x]).dims(), [24, 1]);

    // a negative axis counts back from the rank
    let mut attrs = Attributes::new();
    attrs.set("axis", -3i64).unwrap();
    let mut op = Flatten::new();
    op.initialize(&attrs).unwrap();
    assert_eq!(run_op(&op, &[&x]).dims(), [1, 24]);
}

#[test]
fn flatten_axes_beyond_the_rank_are_rejected() {
    let x = tensor(&[2, 3], &[0.0; 6]);
    let mut attrs = Attributes::new();
    attrs.set("axis", 4i64).unwrap();
    let mut op = Flatten::new();
    op.initialize(&attrs).unwrap();
    let err = op.run(&[&x]).unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn squeeze_and_unsqueeze_are_inverse_reshapes() {
    let x = tensor(&[1, 3, 1], &[1.0, 2.0, 3.0]);

    let mut squeeze = Squeeze::new();
    squeeze.initialize(&Attributes::new()).unwrap();
    let squeezed = run_op(&squeeze, &[&x]);
    assert_eq!(squeezed.dims(), [3]);

    let mut attrs = Attributes::new();
    attrs.set("axes", vec![0i64, 2]).unwrap();
    let mut unsqueeze = Unsqueeze::new();
    unsqueeze.initialize(&attrs).unwrap();
    assert_eq!(run_op(&unsqueeze, &[&squeezed]), x);
}

#[test]
fn squeeze_rejects_non_unit_axes() {
    let x = tensor(&[1, 3, 1], &[1.0, 2.0, 3.0]);
    let mut attrs = Attributes::new();
    attrs.set("axes", vec![1i64]).unwrap();
    let mut op = Squeeze::new();
    op.initialize(&attrs).unwrap();
    assert!(op.run(&[&x]).is_err());
}

#[test]
fn unsqueeze_requires_its_axes() {
    let mut op = Unsqueeze::new();
    let err = op.initialize(&Attributes::new()).unwrap_err();
    assert!(err.to_string().contains("axes"));
}

#[test]
fn shape_reports_dims_as_int64_data() {
    let x = tensor(&[2, 3, 4], &[0.0; 24]);
    let y = run_op(&Shape, &[&x]);
    assert_eq!(y.dtype(), DataType::I64);
    assert_eq!(y.dims(), [3]);
    assert_eq!(y.i64_data().unwrap(), [2, 3, 4]);
}

#[test]
fn identity_and_dropout_pass_tensors_through() {
    let x = tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(run_op(&Identity, &[&x]), x);

    let mut dropout = Dropout;
    let mut attrs = Attributes::new();
    attrs.set("ratio", 0.3f32).unwrap();
    dropout.initialize(&attrs).unwrap();
    assert_eq!(run_op(&dropout, &[&x]), x);
}

#[test]
fn dropout_validates_its_ratio() {
    let mut op = Dropout;
    let mut attrs = Attributes::new();
    attrs.set("ratio", 1.5f32).unwrap();
    let err = op.initialize(&attrs).unwrap_err();
    assert!(err.to_string().contains("ratio"));
}

#[test]
fn concat_then_slice_recovers_the_pieces() {
    let a = tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.0]);
    let b = tensor(&[2, 3], &[5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);

    let mut attrs = Attributes::new();
    attrs.set("axis", 1i64).unwrap();
    let mut concat = Concat::new();
    concat.initialize(&attrs).unwrap();
    let joined = run_op(&concat, &[&a, &b]);
    assert_f32_tensor(
        &joined,
        &[2, 5],
        &[1.0, 2.0, 5.0, 6.0, 7.0, 3.0, 4.0, 8.0, 9.0, 10.0],
    );

    let mut first_attrs = Attributes::new();
    first_attrs.set("starts", vec![0i64]).unwrap();
    first_attrs.set("ends", vec![2i64]).unwrap();
    first_attrs.set("axes", vec![1i64]).unwrap();
    let mut first = Slice::new();
    first.initialize(&first_attrs).unwrap();
    assert_eq!(run_op(&first, &[&joined]), a);

    let mut second_attrs = Attributes::new();
    second_attrs.set("starts", vec![2i64]).unwrap();
    second_attrs.set("ends", vec![5i64]).unwrap();
    second_attrs.set("axes", vec![1i64]).unwrap();
    let mut second = Slice::new();
    second.initialize(&second_attrs).unwrap();
    assert_eq!(run_op(&second, &[&joined]), b);
}

#[test]
fn concat_along_the_leading_axis_appends_buffers() {
    let a = tensor(&[1, 3], &[1.0, 2.0, 3.0]);
    let b = tensor(&[2, 3], &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    let mut attrs = Attributes::new();
    attrs.set("axis", 0i64).unwrap();
    let mut op = Concat::new();
    op.initialize(&attrs).unwrap();
    assert_f32_tensor(
        &run_op(&op, &[&a, &b]),
        &[3, 3],
        &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
    );
}

#[test]
fn negative_concat_axes_wrap() {
    let a = tensor(&[2, 1], &[1.0, 3.0]);
    let b = tensor(&[2, 1], &[2.0, 4.0]);
    let mut attrs = Attributes::new();
    attrs.set("axis", -1i64).unwrap();
    let mut op = Concat::new();
    op.initialize(&attrs).unwrap();
    assert_f32_tensor(&run_op(&op, &[&a, &b]), &[2, 2], &[1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn concat_validates_the_other_dimensions() {
    let a = tensor(&[2, 2], &[0.0; 4]);
    let b = tensor(&[2, 3], &[0.0; 6]);
    let mut attrs = Attributes::new();
    attrs.set("axis", 0i64).unwrap();
    let mut op = Concat::new();
    op.initialize(&attrs).unwrap();
    let err = op.run(&[&a, &b]).unwrap_err();
    assert!(err.to_string().contains("non-concat dimension"));

    let c = tensor(&[2], &[0.0; 2]);
    let err = op.run(&[&a, &c]).unwrap_err();
    assert!(err.to_string().contains("rank"));
}

#[test]
fn concat_requires_an_axis_attribute() {
    let mut op = Concat::new();
    let err = op.initialize(&Attributes::new()).unwrap_err();
    assert!(err.to_string().contains("axis"));
}

#[test]
fn slice_reads_bounds_from_tensor_inputs() {
    let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
    let x = tensor(&[3, 4], &values);
    let starts = Tensor::from_i64(vec![2], vec![1, 0]).unwrap();
    let ends = Tensor::from_i64(vec![2], vec![3, 2]).unwrap();
    let y = run_op(&Slice::new(), &[&x, &starts, &ends]);
    assert_f32_tensor(&y, &[2, 2], &[4.0, 5.0, 8.0, 9.0]);
}

#[test]
fn slice_accepts_axes_and_unit_steps_as_inputs() {
    let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
    let x = tensor(&[3, 4], &values);
    let starts = Tensor::from_i64(vec![1], vec![1]).unwrap();
    let ends = Tensor::from_i64(vec![1], vec![3]).unwrap();
    let axes = Tensor::from_i64(vec![1], vec![1]).unwrap();
    let steps = Tensor::from_i64(vec![1], vec![1]).unwrap();
    let y = run_op(&Slice::new(), &[&x, &starts, &ends, &axes, &steps]);
    assert_f32_tensor(&y, &[3, 2], &[1.0, 2.0, 5.0, 6.0, 9.0, 10.0]);
}

#[test]
fn non_unit_slice_steps_are_rejected() {
    let x = tensor(&[4], &[0.0; 4]);
    let starts = Tensor::from_i64(vec![1], vec![0]).unwrap();
    let ends = Tensor::from_i64(vec![1], vec![4]).unwrap();
    let axes = Tensor::from_i64(vec![1], vec![0]).unwrap();
    let steps = Tensor::from_i64(vec![1], vec![2]).unwrap();
    let err = Slice::new()
        .run(&[&x, &starts, &ends, &axes, &steps])
        .unwrap_err();
    assert!(err.to_string().contains("steps"));
}

#[test]
fn slice_bounds_clamp_high_and_wrap_negative() {
    let x = tensor(&[5], &[0.0, 1.0, 2.0, 3.0, 4.0]);
    let mut attrs = Attributes::new();
    attrs.set("starts", vec![-3i64]).unwrap();
    attrs.set("ends", vec![100i64]).unwrap();
    let mut op = Slice::new();
    op.initialize(&attrs).unwrap();
    assert_f32_tensor(&run_op(&op, &[&x]), &[3], &[2.0, 3.0, 4.0]);
}

#[test]
fn backwards_slice_bounds_are_an_error() {
    let x = tensor(&[5], &[0.0; 5]);
    let mut attrs = Attributes::new();
    attrs.set("starts", vec![3i64]).unwrap();
    attrs.set("ends", vec![1i64]).unwrap();
    let mut op = Slice::new();
    op.initialize(&attrs).unwrap();
    let err = op.run(&[&x]).unwrap_err();
    assert!(err.to_string().contains("negative extent"));
}

#[test]
fn gather_rearranges_rows_and_wraps_negatives() {
    let x = tensor(&[3, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let picks = Tensor::from_i64(vec![3], vec![2, 0, -1]).unwrap();
    let mut op = Gather::new();
    op.initialize(&Attributes::new()).unwrap();
    assert_f32_tensor(
        &run_op(&op, &[&x, &picks]),
        &[3, 2],
        &[5.0, 6.0, 1.0, 2.0, 5.0, 6.0],
    );
}

#[test]
fn gather_axis_one_picks_columns() {
    let x = tensor(&[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let picks = Tensor::from_i32(vec![2], vec![2, 2]).unwrap();
    let mut attrs = Attributes::new();
    attrs.set("axis", 1i64).unwrap();
    let mut op = Gather::new();
    op.initialize(&attrs).unwrap();
    assert_f32_tensor(&run_op(&op, &[&x, &picks]), &[2, 2], &[3.0, 3.0, 6.0, 6.0]);
}

#[test]
fn gather_splices_the_index_shape_into_the_output() {
    // a [2,2] index grid over a [3] vector gives a [2,2] result
    let x = tensor(&[3], &[10.0, 20.0, 30.0]);
    let picks = Tensor::from_i64(vec![2, 2], vec![0, 2, 1, 1]).unwrap();
    let mut op = Gather::new();
    op.initialize(&Attributes::new()).unwrap();
    assert_f32_tensor(
        &run_op(&op, &[&x, &picks]),
        &[2, 2],
        &[10.0, 30.0, 20.0, 20.0],
    );
}

#[test]
fn out_of_range_gather_indices_are_fatal() {
    let x = tensor(&[3], &[0.0; 3]);
    let picks = Tensor::from_i64(vec![1], vec![5]).unwrap();
    let mut op = Gather::new();
    op.initialize(&Attributes::new()).unwrap();
    let err = op.run(&[&x, &picks]).unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn tile_repeats_along_every_axis() {
    let x = tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.0]);
    let down = Tensor::from_i64(vec![2], vec![2, 1]).unwrap();
    assert_f32_tensor(
        &run_op(&Tile, &[&x, &down]),
        &[4, 2],
        &[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0],
    );

    let across = Tensor::from_i64(vec![2], vec![1, 2]).unwrap();
    assert_f32_tensor(
        &run_op(&Tile, &[&x, &across]),
        &[2, 4],
        &[1.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 4.0],
    );
}

#[test]
fn tile_validates_the_repeat_vector() {
    let x = tensor(&[2, 2], &[0.0; 4]);
    let short = Tensor::from_i64(vec![1], vec![2]).unwrap();
    assert!(Tile.run(&[&x, &short]).is_err());
    let negative = Tensor::from_i64(vec![2], vec![2, -1]).unwrap();
    assert!(Tile.run(&[&x, &negative]).is_err());
}
