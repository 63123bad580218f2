//! Shape and broadcast algebra.
//!
//! Shapes are row-major dimension lists. Everything here is pure index
//! arithmetic: strides, offset/index conversions, numpy-style broadcasting
//! (plus the matrix-multiply variant that exempts the trailing two
//! dimensions), reshape inference and the pooling/convolution output-shape
//! rules with their auto-pad policies.

use smallvec::{smallvec, SmallVec};

use crate::error::{Error, Result};

/// Transient index/stride buffer. Graphs rarely exceed rank 8, so index math
/// stays off the heap in the common case.
pub type Index = SmallVec<[usize; 8]>;

/// Element count of a shape. The empty shape is a scalar holding one value.
pub fn num_elements(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Row-major strides: `stride[i] = product(dims[i+1..])`.
pub fn compute_strides(dims: &[usize]) -> Index {
    let mut strides: Index = smallvec![1; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

pub fn indices_to_offset(indices: &[usize], strides: &[usize]) -> usize {
    debug_assert_eq!(indices.len(), strides.len());
    indices.iter().zip(strides).map(|(i, s)| i * s).sum()
}

/// Successive div/mod from the most significant dimension.
pub fn offset_to_indices(offset: usize, strides: &[usize]) -> Index {
    let mut indices: Index = smallvec![0; strides.len()];
    let mut rest = offset;
    for (i, &stride) in strides.iter().enumerate() {
        indices[i] = rest / stride;
        rest %= stride;
    }
    indices
}

/// Odometer-style increment over the first `axis_count` dimensions of
/// `index`. Wraps back to zeros after the last position.
pub fn increment_index(index: &mut [usize], dims: &[usize], axis_count: usize) {
    debug_assert!(axis_count <= dims.len());
    debug_assert_eq!(index.len(), dims.len());
    for k in (0..axis_count).rev() {
        index[k] += 1;
        if index[k] < dims[k] {
            break;
        }
        index[k] = 0;
    }
}

/// Wraps a possibly negative axis into `[0, rank)`.
pub fn normalize_axis(axis: i64, rank: usize) -> Result<usize> {
    let r = rank as i64;
    if axis < -r || axis >= r {
        return Err(Error::shape(format!(
            "axis {axis} is out of range for rank {rank}"
        )));
    }
    Ok(if axis < 0 { (axis + r) as usize } else { axis as usize })
}

pub fn normalize_axes(axes: &[i64], rank: usize) -> Result<Vec<usize>> {
    axes.iter().map(|&a| normalize_axis(a, rank)).collect()
}

/// Product of `dims[axis..]`.
pub fn size_from_dimension(dims: &[usize], axis: usize) -> usize {
    dims[axis..].iter().product()
}

/// Product of `dims[..axis]`.
pub fn size_to_dimension(dims: &[usize], axis: usize) -> usize {
    dims[..axis].iter().product()
}

/// Broadcast two shapes with right-aligned dimension matching. The shorter
/// shape is padded on the left with 1s; aligned dimensions must be equal or
/// one of them must be 1.
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    calc_broadcast_shape(a, b, false)
}

/// Matrix-multiply broadcasting: the trailing two dimensions are taken as
/// the 2-D matrix shapes (with a contraction compatibility check) and only
/// the leading dimensions broadcast. Both inputs must have rank >= 2.
pub fn broadcast_matmul_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    calc_broadcast_shape(a, b, true)
}

fn calc_broadcast_shape(a: &[usize], b: &[usize], is_matmul: bool) -> Result<Vec<usize>> {
    let arank = a.len();
    let brank = b.len();
    let crank = arank.max(brank);
    let mut out = vec![0usize; crank];

    let mut loop_end = crank;
    if is_matmul {
        if arank < 2 || brank < 2 {
            return Err(Error::shape(format!(
                "matrix multiply requires rank >= 2 operands, got {arank} and {brank}"
            )));
        }
        if a[arank - 1] != b[brank - 2] {
            return Err(Error::shape(format!(
                "contraction dimension mismatch: {} vs {}",
                a[arank - 1],
                b[brank - 2]
            )));
        }
        out[crank - 2] = a[arank - 2];
        out[crank - 1] = b[brank - 1];
        loop_end = crank - 2;
    }

    for i in 0..loop_end {
        let ad = if i < crank - arank { 1 } else { a[i - (crank - arank)] };
        let bd = if i < crank - brank { 1 } else { b[i - (crank - brank)] };
        if ad != bd && ad > 1 && bd > 1 {
            return Err(Error::shape(format!(
                "shapes {a:?} and {b:?} are not broadcastable"
            )));
        }
        out[i] = ad.max(bd);
    }
    Ok(out)
}

/// Maps a multi-index into a broadcast output back into an input of
/// (possibly smaller) shape `in_dims`, right-aligned: each position takes
/// `index mod input_dim`, which sends size-1 dimensions to 0. The caller
/// guarantees `in_dims` is broadcast-compatible with the output shape.
pub fn fill_broadcast_index(out_index: &[usize], in_dims: &[usize], in_index: &mut [usize]) {
    debug_assert!(in_dims.len() <= out_index.len());
    debug_assert_eq!(in_index.len(), in_dims.len());
    let offset = out_index.len() - in_dims.len();
    for i in 0..in_dims.len() {
        in_index[i] = out_index[offset + i] % in_dims[i];
    }
}

/// Resolves a requested reshape against an input shape. At most one entry
/// may be -1 (inferred so the element count is preserved); a 0 entry copies
/// the input dimension at the same position.
pub fn reshape_dims(input_dims: &[usize], requested: &[i64]) -> Result<Vec<usize>> {
    let mut out = vec![0usize; requested.len()];
    let mut inferred: Option<usize> = None;
    let mut known_size = 1usize;

    for (i, &hint) in requested.iter().enumerate() {
        if hint < -1 {
            return Err(Error::shape(format!(
                "invalid dimension {hint} in reshape target"
            )));
        }
        if hint == -1 {
            if inferred.is_some() {
                return Err(Error::shape(
                    "only one reshape dimension can be inferred".to_string(),
                ));
            }
            inferred = Some(i);
        } else {
            out[i] = if hint == 0 {
                if i >= input_dims.len() {
                    return Err(Error::shape(
                        "zero-copy reshape dimension exceeds the input rank".to_string(),
                    ));
                }
                input_dims[i]
            } else {
                hint as usize
            };
            known_size *= out[i];
        }
    }

    let input_size = num_elements(input_dims);
    match inferred {
        Some(i) => {
            if known_size == 0 || input_size % known_size != 0 {
                return Err(Error::shape(format!(
                    "cannot infer reshape dimension: {input_size} elements do not divide into {requested:?}"
                )));
            }
            out[i] = input_size / known_size;
        }
        None => {
            if known_size != input_size {
                return Err(Error::shape(format!(
                    "reshape from {input_dims:?} to {requested:?} changes the element count"
                )));
            }
        }
    }
    Ok(out)
}

/// Collapses a shape to 2-D around `axis`: `[prefix product, suffix product]`.
pub fn flatten_dims(dims: &[usize], axis: usize) -> [usize; 2] {
    [size_to_dimension(dims, axis), size_from_dimension(dims, axis)]
}

/// Drops size-1 dimensions. With an explicit axis list every listed axis
/// must be size 1; with an empty list all size-1 dimensions drop.
pub fn squeeze_dims(dims: &[usize], axes: &[i64]) -> Result<Vec<usize>> {
    let axes = normalize_axes(axes, dims.len())?;
    let mut out = Vec::with_capacity(dims.len());
    for (i, &d) in dims.iter().enumerate() {
        let listed = axes.contains(&i);
        if listed && d != 1 {
            return Err(Error::shape(format!(
                "cannot squeeze axis {i} of size {d}"
            )));
        }
        if (axes.is_empty() && d > 1) || (!axes.is_empty() && !listed) {
            out.push(d);
        }
    }
    Ok(out)
}

/// Inserts size-1 dimensions at the given positions of the output shape.
/// Axes are interpreted against the output rank; duplicates are rejected.
pub fn unsqueeze_dims(dims: &[usize], axes: &[i64]) -> Result<Vec<usize>> {
    let out_rank = dims.len() + axes.len();
    let mut out = vec![0usize; out_rank];
    for &axis in axes {
        let a = normalize_axis(axis, out_rank)?;
        if out[a] != 0 {
            return Err(Error::shape(format!("duplicate unsqueeze axis {axis}")));
        }
        out[a] = 1;
    }
    let mut src = dims.iter();
    for slot in out.iter_mut() {
        if *slot == 0 {
            // every input dim lands in exactly one remaining slot
            *slot = *src.next().unwrap_or(&1);
        }
    }
    Ok(out)
}

/// `out[i] = dims[perm[i]]`. The permutation must be a valid reordering of
/// `0..rank`.
pub fn permute_dims(dims: &[usize], perm: &[usize]) -> Result<Vec<usize>> {
    if perm.len() != dims.len() {
        return Err(Error::shape(format!(
            "permutation of length {} does not match rank {}",
            perm.len(),
            dims.len()
        )));
    }
    let mut seen = vec![false; dims.len()];
    for &p in perm {
        if p >= dims.len() || seen[p] {
            return Err(Error::shape(format!("invalid permutation {perm:?}")));
        }
        seen[p] = true;
    }
    Ok(perm.iter().map(|&p| dims[p]).collect())
}

pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0usize; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inv[p] = i;
    }
    inv
}

/// Auto-pad policy for pooling and convolution, as declared by the
/// `auto_pad` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPad {
    NotSet,
    SameUpper,
    SameLower,
    Valid,
}

impl AutoPad {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "NOTSET" | "" => Ok(AutoPad::NotSet),
            "SAME_UPPER" => Ok(AutoPad::SameUpper),
            "SAME_LOWER" => Ok(AutoPad::SameLower),
            "VALID" => Ok(AutoPad::Valid),
            other => Err(Error::configuration(format!(
                "unrecognized auto_pad value '{other}'"
            ))),
        }
    }
}

/// Fills in pooling attribute defaults and validates ranks: a global
/// operator takes the full spatial extent as its kernel; strides default to
/// 1 and pads to 0 per spatial dimension.
pub fn adjust_pool_attributes(
    is_global: bool,
    input_dims: &[usize],
    kernel_shape: &mut Vec<usize>,
    strides: &mut Vec<usize>,
    pads: &mut Vec<usize>,
) -> Result<()> {
    if input_dims.len() < 3 {
        return Err(Error::shape(
            "pooling requires at least one spatial dimension".to_string(),
        ));
    }
    let spatial_rank = input_dims.len() - 2;

    if is_global {
        kernel_shape.clear();
        kernel_shape.extend_from_slice(&input_dims[2..]);
    }
    if kernel_shape.len() != spatial_rank {
        return Err(Error::shape(format!(
            "kernel of rank {} does not match {} spatial dimensions",
            kernel_shape.len(),
            spatial_rank
        )));
    }
    for (i, &k) in kernel_shape.iter().enumerate() {
        if !is_global && k > input_dims[i + 2] + pads.get(i).unwrap_or(&0) + pads.get(i + spatial_rank).unwrap_or(&0) {
            return Err(Error::shape(
                "kernel is larger than the padded input".to_string(),
            ));
        }
    }

    if strides.is_empty() {
        strides.resize(spatial_rank, 1);
    } else if strides.len() != spatial_rank {
        return Err(Error::shape("strides do not match the spatial rank".to_string()));
    }
    if pads.is_empty() {
        pads.resize(spatial_rank * 2, 0);
    } else if pads.len() != spatial_rank * 2 {
        return Err(Error::shape(
            "pads must hold a begin and end value per spatial dimension".to_string(),
        ));
    }
    Ok(())
}

/// Output shape of a pooling window sweep: `[N, C, spatial...]`. `pads` is
/// rewritten when an auto-pad policy applies.
pub fn compute_pool_output_dims(
    input_dims: &[usize],
    kernel_shape: &[usize],
    strides: &[usize],
    pads: &mut [usize],
    auto_pad: AutoPad,
) -> Result<Vec<usize>> {
    let dilations = vec![1usize; kernel_shape.len()];
    let mut out = vec![input_dims[0], input_dims[1]];
    compute_spatial_dims(
        &input_dims[2..],
        kernel_shape,
        strides,
        &dilations,
        pads,
        auto_pad,
        &mut out,
    )?;
    Ok(out)
}

/// Output shape of a convolution: `[N, M, spatial...]` where M is the
/// filter-count dimension of the weight tensor. `pads` is rewritten when an
/// auto-pad policy applies.
pub fn compute_conv_output_dims(
    input_dims: &[usize],
    filter_dims: &[usize],
    kernel_shape: &[usize],
    strides: &[usize],
    dilations: &[usize],
    pads: &mut [usize],
    auto_pad: AutoPad,
) -> Result<Vec<usize>> {
    let mut out = vec![input_dims[0], filter_dims[0]];
    compute_spatial_dims(
        &input_dims[2..],
        kernel_shape,
        strides,
        dilations,
        pads,
        auto_pad,
        &mut out,
    )?;
    Ok(out)
}

fn compute_spatial_dims(
    spatial: &[usize],
    kernel_shape: &[usize],
    strides: &[usize],
    dilations: &[usize],
    pads: &mut [usize],
    auto_pad: AutoPad,
    out: &mut Vec<usize>,
) -> Result<()> {
    if kernel_shape.len() != spatial.len()
        || strides.len() != spatial.len()
        || dilations.len() != spatial.len()
        || pads.len() != spatial.len() * 2
    {
        return Err(Error::shape(
            "kernel, stride, dilation and pad ranks must match the spatial rank".to_string(),
        ));
    }
    for i in 0..spatial.len() {
        out.push(adjust_pad_and_output_dim(
            spatial[i],
            strides[i],
            dilations[i],
            kernel_shape[i],
            pads,
            i,
            i + spatial.len(),
            auto_pad,
        )?);
    }
    Ok(())
}

fn adjust_pad_and_output_dim(
    in_size: usize,
    stride: usize,
    dilation: usize,
    kernel: usize,
    pads: &mut [usize],
    head: usize,
    tail: usize,
    auto_pad: AutoPad,
) -> Result<usize> {
    if stride == 0 || dilation == 0 || kernel == 0 {
        return Err(Error::shape(
            "kernel, stride and dilation values must be positive".to_string(),
        ));
    }
    let dkernel = dilation * (kernel - 1) + 1;
    match auto_pad {
        AutoPad::SameUpper | AutoPad::SameLower => {
            // pad so the strided output covers ceil(in / stride) positions,
            // giving the odd cell to the tail for SAME_UPPER
            let target = (in_size + stride - 1) / stride;
            let needed = ((target - 1) * stride + dkernel).saturating_sub(in_size);
            pads[head] = if auto_pad == AutoPad::SameLower {
                (needed + 1) / 2
            } else {
                needed / 2
            };
            pads[tail] = needed - pads[head];
            Ok((in_size + needed - dkernel) / stride + 1)
        }
        AutoPad::Valid => {
            pads[head] = 0;
            pads[tail] = 0;
            if in_size < dkernel {
                return Err(Error::shape(format!(
                    "effective kernel {dkernel} exceeds unpadded input {in_size}"
                )));
            }
            Ok((in_size - dkernel) / stride + 1)
        }
        AutoPad::NotSet => {
            let padded = in_size + pads[head] + pads[tail];
            if padded < dkernel {
                return Err(Error::shape(format!(
                    "effective kernel {dkernel} exceeds padded input {padded}"
                )));
            }
            Ok((padded - dkernel) / stride + 1)
        }
    }
}
