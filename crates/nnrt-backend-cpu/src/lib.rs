//! Reference CPU backend.
//!
//! Implements the operator contract with plain scalar kernels and publishes
//! them as an ordered resolve-rule table for the default operator domain.
//! Heavy operators compute through widened f64 scratch buffers (convolution
//! lowers to im2col plus a matrix multiply); the metadata-driven ones are
//! buffer copies under new dimensions.

pub mod ops;

use once_cell::sync::Lazy;

use nnrt::operator::Operator;
use nnrt::opset::ResolveRule;
use nnrt::tensor::{DataType, BOOL_TYPES, FLOAT_TYPES, NUMBER_TYPES};

use crate::ops::binary::{self, BinaryOp};
use crate::ops::concat::Concat;
use crate::ops::conv::Conv;
use crate::ops::gather::Gather;
use crate::ops::gemm::Gemm;
use crate::ops::matmul::MatMul;
use crate::ops::pool::Pool;
use crate::ops::reduce::{ReduceKind, ReduceOp};
use crate::ops::shape_ops::{Dropout, Flatten, Identity, Reshape, Shape, Squeeze, Unsqueeze};
use crate::ops::slice::Slice;
use crate::ops::softmax::Softmax;
use crate::ops::sum::Sum;
use crate::ops::tile::Tile;
use crate::ops::transpose::Transpose;
use crate::ops::unary::{self, UnaryOp};

/// The CPU resolve table, scanned in order. Resolution commits to the first
/// op-type match, so every op type appears exactly once with the full
/// version span its kernel covers; behavioral differences within a span
/// (Gemm's optional bias, Slice's two wire forms) are folded into the
/// kernels themselves.
pub static CPU_RESOLVE_RULES: Lazy<Vec<ResolveRule>> = Lazy::new(|| {
    vec![
        rule("Abs", "6+", || Box::new(UnaryOp::new(NUMBER_TYPES, f64::abs))),
        rule("Acos", "7+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::acos))),
        rule("Acosh", "9+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::acosh))),
        rule("Add", "7+", || Box::new(BinaryOp::new(NUMBER_TYPES, binary::add))),
        rule("And", "7+", || Box::new(BinaryOp::new(BOOL_TYPES, binary::logical_and))),
        rule("Asin", "7+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::asin))),
        rule("Asinh", "9+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::asinh))),
        rule("Atan", "7+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::atan))),
        rule("Atanh", "9+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::atanh))),
        rule("AveragePool", "7-10", || Box::new(Pool::average())),
        rule("Ceil", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::ceil))),
        rule("Clip", "6-10", || Box::new(UnaryOp::clip())),
        rule("Concat", "4+", || Box::new(Concat::new())),
        rule("Conv", "1+", || Box::new(Conv::new())),
        rule("Cos", "7+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::cos))),
        rule("Cosh", "9+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::cosh))),
        rule("Div", "7+", || Box::new(BinaryOp::new(NUMBER_TYPES, binary::div))),
        rule("Dropout", "7+", || Box::new(Dropout)),
        rule("Elu", "6+", || Box::new(UnaryOp::elu())),
        rule("Exp", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::exp))),
        rule("Flatten", "1+", || Box::new(Flatten::new())),
        rule("Floor", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::floor))),
        rule("Gather", "1+", || Box::new(Gather::new())),
        rule("Gemm", "7+", || Box::new(Gemm::new())),
        rule("GlobalAveragePool", "1+", || Box::new(Pool::global_average())),
        rule("GlobalMaxPool", "1+", || Box::new(Pool::global_max())),
        rule("Identity", "1+", || Box::new(Identity)),
        rule("IsNaN", "9+", || {
            Box::new(UnaryOp::with_result(FLOAT_TYPES, unary::is_nan, DataType::Bool))
        }),
        rule("LeakyRelu", "6+", || Box::new(UnaryOp::leaky_relu())),
        rule("Log", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::ln))),
        rule("MatMul", "1+", || Box::new(MatMul)),
        rule("MaxPool", "1-9", || Box::new(Pool::max())),
        rule("Mul", "7+", || Box::new(BinaryOp::new(NUMBER_TYPES, binary::mul))),
        rule("Neg", "6+", || Box::new(UnaryOp::new(NUMBER_TYPES, unary::neg))),
        rule("Not", "1+", || Box::new(UnaryOp::new(BOOL_TYPES, unary::not))),
        rule("Or", "7+", || Box::new(BinaryOp::new(BOOL_TYPES, binary::logical_or))),
        rule("PRelu", "7+", || Box::new(BinaryOp::new(NUMBER_TYPES, binary::prelu))),
        rule("Pow", "7+", || Box::new(BinaryOp::new(NUMBER_TYPES, f64::powf))),
        rule("Reciprocal", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, unary::reciprocal))),
        rule("ReduceLogSum", "1+", || Box::new(ReduceOp::new(ReduceKind::LogSum))),
        rule("ReduceMax", "1+", || Box::new(ReduceOp::new(ReduceKind::Max))),
        rule("ReduceMean", "1+", || Box::new(ReduceOp::new(ReduceKind::Mean))),
        rule("ReduceMin", "1+", || Box::new(ReduceOp::new(ReduceKind::Min))),
        rule("ReduceProd", "1+", || Box::new(ReduceOp::new(ReduceKind::Prod))),
        rule("ReduceSum", "1+", || Box::new(ReduceOp::new(ReduceKind::Sum))),
        rule("ReduceSumSquare", "1+", || Box::new(ReduceOp::new(ReduceKind::SumSquare))),
        rule("Relu", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, unary::relu))),
        rule("Reshape", "5+", || Box::new(Reshape)),
        rule("Shape", "1+", || Box::new(Shape)),
        rule("Sigmoid", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, unary::sigmoid))),
        rule("Sign", "9+", || Box::new(UnaryOp::new(NUMBER_TYPES, unary::sign))),
        rule("Sin", "7+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::sin))),
        rule("Sinh", "9+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::sinh))),
        rule("Slice", "1+", || Box::new(Slice::new())),
        rule("Softmax", "1+", || Box::new(Softmax::new())),
        rule("Sqrt", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::sqrt))),
        rule("Squeeze", "1+", || Box::new(Squeeze::new())),
        rule("Sub", "7+", || Box::new(BinaryOp::new(NUMBER_TYPES, binary::sub))),
        rule("Sum", "6+", || Box::new(Sum)),
        rule("Tan", "7+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::tan))),
        rule("Tanh", "6+", || Box::new(UnaryOp::new(FLOAT_TYPES, f64::tanh))),
        rule("Tile", "6+", || Box::new(Tile)),
        rule("Transpose", "1+", || Box::new(Transpose::new())),
        rule("Unsqueeze", "1+", || Box::new(Unsqueeze::new())),
        rule("Xor", "7+", || Box::new(BinaryOp::new(BOOL_TYPES, binary::logical_xor))),
    ]
});

/// The rule table as a borrowed slice, ready to hand to a session.
pub fn resolve_rules() -> &'static [ResolveRule] {
    CPU_RESOLVE_RULES.as_slice()
}

fn rule(
    op_type: &'static str,
    versions: &'static str,
    factory: fn() -> Box<dyn Operator>,
) -> ResolveRule {
    ResolveRule::new(op_type, "", versions, factory)
}
