//! Core execution engine for neural-network operator graphs.
//!
//! The crate is backend-agnostic: it owns the tensor data model, the shape
//! and broadcast algebra, the computation graph with its two-color
//! partitioner, versioned operator resolution, model snapshots and the
//! session driver. Backends plug in by publishing a [`opset::ResolveRule`]
//! table whose factories build [`operator::Operator`] implementations;
//! `nnrt-backend-cpu` is the reference.

pub mod attribute;
pub mod error;
pub mod graph;
pub mod model;
pub mod operator;
pub mod opset;
pub mod session;
pub mod tensor;

pub use attribute::{AttrValue, Attributes};
pub use error::{Error, Result};
pub use graph::Graph;
pub use model::Model;
pub use operator::{Operator, OperatorFactory};
pub use opset::{OpSet, ResolveRule};
pub use session::{Plan, Session};
pub use tensor::{DataType, Tensor, TensorData};
