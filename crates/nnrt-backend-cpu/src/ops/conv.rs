//! 2-D convolution, lowered to im2col plus a matrix multiply.

use nnrt::attribute::Attributes;
use nnrt::error::{Error, Result};
use nnrt::operator::Operator;
use nnrt::tensor::shape::{self, AutoPad};
use nnrt::tensor::{Tensor, TensorData, FLOAT_TYPES};

use super::gemm::gemm_2d;
use super::{numeric_vec, usize_list};

/// Unfolds one `[C, H, W]` image into a `[C * kernel_h * kernel_w,
/// out_h * out_w]` column matrix. With unit dilation and no padding every
/// kernel row reads a contiguous run of the image, so whole rows are block
/// copied; otherwise each element walks the padded, dilated source
/// coordinates and zero-fills whatever lands outside the image.
#[allow(clippy::too_many_arguments)]
fn im2col(
    image: &[f64],
    col: &mut [f64],
    channels: usize,
    height: usize,
    width: usize,
    kernel_h: usize,
    kernel_w: usize,
    dilations: &[usize],
    pads: &[usize],
    strides: &[usize],
    out_h: usize,
    out_w: usize,
) {
    let stride_h = strides[0];
    let stride_w = strides[1];
    let dilation_h = dilations[0];
    let dilation_w = dilations[1];
    let pad_top = pads[0];
    let pad_left = pads[1];

    if dilation_h == 1 && dilation_w == 1 && pads.iter().all(|&p| p == 0) {
        for k in 0..channels * kernel_h * kernel_w {
            let kw = k % kernel_w;
            let kh = k / kernel_w % kernel_h;
            let channel = k / (kernel_w * kernel_h);
            let dst_base = k * out_h * out_w;
            let src_base = channel * height * width;
            for y in 0..out_h {
                let row = src_base + (y * stride_h + kh) * width + kw;
                let dst = dst_base + y * out_w;
                if stride_w == 1 {
                    col[dst..dst + out_w].copy_from_slice(&image[row..row + out_w]);
                } else {
                    for x in 0..out_w {
                        col[dst + x] = image[row + x * stride_w];
                    }
                }
            }
        }
        return;
    }

    for k in 0..channels * kernel_h * kernel_w {
        let kw = k % kernel_w;
        let kh = k / kernel_w % kernel_h;
        let channel = k / (kernel_w * kernel_h);
        let dst_base = k * out_h * out_w;
        let src_base = channel * height * width;
        for y in 0..out_h {
            let sy = (y * stride_h + kh * dilation_h) as isize - pad_top as isize;
            for x in 0..out_w {
                let sx = (x * stride_w + kw * dilation_w) as isize - pad_left as isize;
                col[dst_base + y * out_w + x] =
                    if sy >= 0 && sy < height as isize && sx >= 0 && sx < width as isize {
                        image[src_base + sy as usize * width + sx as usize]
                    } else {
                        0.0
                    };
            }
        }
    }
}

/// 2-D convolution over `[N, C, H, W]` inputs and `[M, C/group, kH, kW]`
/// filters, with optional per-filter bias.
pub struct Conv {
    auto_pad: AutoPad,
    dilations: Vec<usize>,
    group: usize,
    kernel_shape: Vec<usize>,
    pads: Vec<usize>,
    strides: Vec<usize>,
}

impl Conv {
    pub fn new() -> Conv {
        Conv {
            auto_pad: AutoPad::NotSet,
            dilations: Vec::new(),
            group: 1,
            kernel_shape: Vec::new(),
            pads: Vec::new(),
            strides: Vec::new(),
        }
    }
}

impl Default for Conv {
    fn default() -> Conv {
        Conv::new()
    }
}

impl Operator for Conv {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        if !(2..=3).contains(&inputs.len()) {
            return false;
        }
        let dtype = inputs[0].dtype();
        FLOAT_TYPES.contains(&dtype)
            && inputs.iter().all(|t| t.dtype() == dtype)
            && inputs[0].rank() == 4
            && inputs[1].rank() == 4
            && inputs.get(2).map_or(true, |b| b.rank() == 1)
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.auto_pad = AutoPad::parse(&attrs.get_string_or("auto_pad", String::new())?)?;
        self.dilations = usize_list(&attrs.get_ints_or("dilations", Vec::new())?, "dilations")?;
        let group = attrs.get_int_or("group", 1)?;
        if group < 1 {
            return Err(Error::configuration(format!(
                "group must be positive, got {group}"
            )));
        }
        self.group = group as usize;
        self.kernel_shape = usize_list(
            &attrs.get_ints_or("kernel_shape", Vec::new())?,
            "kernel_shape",
        )?;
        self.pads = usize_list(&attrs.get_ints_or("pads", Vec::new())?, "pads")?;
        self.strides = usize_list(&attrs.get_ints_or("strides", Vec::new())?, "strides")?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let w = inputs[1];
        if !self.kernel_shape.is_empty() && self.kernel_shape[..] != w.dims()[2..] {
            return Err(Error::shape(format!(
                "kernel_shape {:?} does not match the filter's spatial dimensions {:?}",
                self.kernel_shape,
                &w.dims()[2..]
            )));
        }
        let mut kernel_shape = self.kernel_shape.clone();
        if kernel_shape.is_empty() {
            kernel_shape.extend_from_slice(&w.dims()[2..]);
        }

        let spatial_rank = x.rank() - 2;
        let mut strides = self.strides.clone();
        if strides.is_empty() {
            strides.resize(spatial_rank, 1);
        }
        let mut dilations = self.dilations.clone();
        if dilations.is_empty() {
            dilations.resize(spatial_rank, 1);
        }
        let mut pads = self.pads.clone();
        if pads.is_empty() {
            pads.resize(spatial_rank * 2, 0);
        }

        let channels = x.dims()[1];
        let filters = w.dims()[0];
        if channels % self.group != 0 || filters % self.group != 0 {
            return Err(Error::shape(format!(
                "{channels} channels and {filters} filters do not divide into {} groups",
                self.group
            )));
        }
        if w.dims()[1] * self.group != channels {
            return Err(Error::shape(format!(
                "filter expects {} input channels but the input carries {channels}",
                w.dims()[1] * self.group
            )));
        }

        let out_dims = shape::compute_conv_output_dims(
            x.dims(),
            w.dims(),
            &kernel_shape,
            &strides,
            &dilations,
            &mut pads,
            self.auto_pad,
        )?;

        let batch = x.dims()[0];
        let height = x.dims()[2];
        let width = x.dims()[3];
        let out_h = out_dims[2];
        let out_w = out_dims[3];
        let kernel_h = kernel_shape[0];
        let kernel_w = kernel_shape[1];

        let group_channels = channels / self.group;
        let group_filters = filters / self.group;
        let kernel_dim = group_channels * kernel_h * kernel_w;
        let out_image = out_h * out_w;
        let x_group_size = group_channels * height * width;
        let w_group_size = group_filters * kernel_dim;
        let y_group_size = group_filters * out_image;

        let x_values = numeric_vec(x);
        let w_values = numeric_vec(w);
        let mut y = vec![0.0f64; shape::num_elements(&out_dims)];
        let mut col = vec![0.0f64; kernel_dim * out_image];

        for image in 0..batch {
            for g in 0..self.group {
                let x_base = image * channels * height * width + g * x_group_size;
                im2col(
                    &x_values[x_base..x_base + x_group_size],
                    &mut col,
                    group_channels,
                    height,
                    width,
                    kernel_h,
                    kernel_w,
                    &dilations,
                    &pads,
                    &strides,
                    out_h,
                    out_w,
                );
                let y_base = image * filters * out_image + g * y_group_size;
                gemm_2d(
                    false,
                    false,
                    group_filters,
                    out_image,
                    kernel_dim,
                    1.0,
                    &w_values[g * w_group_size..],
                    &col,
                    0.0,
                    &mut y[y_base..y_base + y_group_size],
                );
            }
        }

        if let Some(b) = inputs.get(2) {
            if b.len() != filters {
                return Err(Error::shape(format!(
                    "bias of {} values does not match {filters} filters",
                    b.len()
                )));
            }
            let b_data = b.data();
            for image in 0..batch {
                for f in 0..filters {
                    let bias = b_data.numeric(f);
                    let base = (image * filters + f) * out_image;
                    for v in &mut y[base..base + out_image] {
                        *v += bias;
                    }
                }
            }
        }

        let mut out = TensorData::zeroed(x.dtype(), y.len());
        for (i, &v) in y.iter().enumerate() {
            out.set_numeric(i, v);
        }
        Ok(vec![Tensor::new(out_dims, out)?])
    }
}
