//! The operator contract every backend implements.

use std::fmt;

use crate::attribute::Attributes;
use crate::error::Result;
use crate::tensor::Tensor;

/// One resolved graph operator.
///
/// `check_inputs` validates arity and element types without failing hard;
/// the caller decides how to report a rejected node. `initialize` binds
/// attributes once, immediately after construction, and must fail on
/// missing or malformed configuration. `run` is a pure function of the
/// bound attributes and its inputs: it never mutates an input tensor and
/// always allocates fresh outputs.
pub trait Operator: Send + Sync {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool;

    fn initialize(&mut self, _attrs: &Attributes) -> Result<()> {
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>>;
}

impl fmt::Debug for dyn Operator + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<operator>")
    }
}

/// Constructs an uninitialized operator instance; the registry calls this
/// for the first matching resolve rule.
pub type OperatorFactory = fn() -> Box<dyn Operator>;
