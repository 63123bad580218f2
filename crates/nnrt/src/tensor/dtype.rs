//! Tensor element types and the constraint sets used by operator
//! resolution.

use serde::{Deserialize, Serialize};

/// Element type of a tensor. The set is fixed; backends are free to support
/// only a subset and reject the rest through `Operator::check_inputs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Str,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::I8 => "int8",
            DataType::I16 => "int16",
            DataType::I32 => "int32",
            DataType::I64 => "int64",
            DataType::U8 => "uint8",
            DataType::U16 => "uint16",
            DataType::U32 => "uint32",
            DataType::U64 => "uint64",
            DataType::F32 => "float32",
            DataType::F64 => "float64",
            DataType::Bool => "bool",
            DataType::Str => "string",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataType::Bool | DataType::Str)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// All numeric element types. The usual constraint for arithmetic operators.
pub const NUMBER_TYPES: &[DataType] = &[
    DataType::I8,
    DataType::I16,
    DataType::I32,
    DataType::I64,
    DataType::U8,
    DataType::U16,
    DataType::U32,
    DataType::U64,
    DataType::F32,
    DataType::F64,
];

/// Floating point element types only.
pub const FLOAT_TYPES: &[DataType] = &[DataType::F32, DataType::F64];

/// Boolean element type, for logical operators.
pub const BOOL_TYPES: &[DataType] = &[DataType::Bool];

/// Integer types accepted wherever indices are taken as tensor data.
pub const INDEX_TYPES: &[DataType] = &[DataType::I32, DataType::I64];
