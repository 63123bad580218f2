//! Typed node attributes.
//!
//! Operators read their configuration through the typed getters at
//! `initialize` time: a missing key without a default and a present key of
//! the wrong type are both configuration errors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Float(f32),
    Int(i64),
    String(String),
    Tensor(Tensor),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
}

impl AttrValue {
    fn kind(&self) -> &'static str {
        match self {
            AttrValue::Float(_) => "float",
            AttrValue::Int(_) => "int",
            AttrValue::String(_) => "string",
            AttrValue::Tensor(_) => "tensor",
            AttrValue::Floats(_) => "floats",
            AttrValue::Ints(_) => "ints",
            AttrValue::Strings(_) => "strings",
        }
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

impl From<Vec<f32>> for AttrValue {
    fn from(v: Vec<f32>) -> Self {
        AttrValue::Floats(v)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(v: Vec<i64>) -> Self {
        AttrValue::Ints(v)
    }
}

impl From<Tensor> for AttrValue {
    fn from(v: Tensor) -> Self {
        AttrValue::Tensor(v)
    }
}

/// The attribute map of one graph node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes {
    entries: HashMap<String, AttrValue>,
}

macro_rules! typed_getter {
    ($required:ident, $with_default:ident, $variant:ident, $ty:ty, $clone:expr) => {
        pub fn $required(&self, name: &str) -> Result<$ty> {
            match self.entries.get(name) {
                Some(AttrValue::$variant(v)) => Ok($clone(v)),
                Some(other) => Err(self.mismatch(name, stringify!($variant), other)),
                None => Err(Error::configuration(format!(
                    "required attribute not found: {name}"
                ))),
            }
        }

        pub fn $with_default(&self, name: &str, default: $ty) -> Result<$ty> {
            match self.entries.get(name) {
                Some(AttrValue::$variant(v)) => Ok($clone(v)),
                Some(other) => Err(self.mismatch(name, stringify!($variant), other)),
                None => Ok(default),
            }
        }
    };
}

impl Attributes {
    pub fn new() -> Attributes {
        Attributes::default()
    }

    /// Adds an attribute, rejecting duplicated names.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Error::configuration(format!(
                "duplicated attribute name: {name}"
            )));
        }
        self.entries.insert(name, value.into());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    typed_getter!(get_float, get_float_or, Float, f32, |v: &f32| *v);
    typed_getter!(get_int, get_int_or, Int, i64, |v: &i64| *v);
    typed_getter!(get_string, get_string_or, String, String, |v: &String| v
        .clone());
    typed_getter!(get_floats, get_floats_or, Floats, Vec<f32>, |v: &Vec<f32>| v
        .clone());
    typed_getter!(get_ints, get_ints_or, Ints, Vec<i64>, |v: &Vec<i64>| v
        .clone());
    typed_getter!(
        get_strings,
        get_strings_or,
        Strings,
        Vec<String>,
        |v: &Vec<String>| v.clone()
    );

    pub fn get_tensor(&self, name: &str) -> Result<&Tensor> {
        match self.entries.get(name) {
            Some(AttrValue::Tensor(v)) => Ok(v),
            Some(other) => Err(self.mismatch(name, "Tensor", other)),
            None => Err(Error::configuration(format!(
                "required attribute not found: {name}"
            ))),
        }
    }

    fn mismatch(&self, name: &str, expected: &str, found: &AttrValue) -> Error {
        Error::configuration(format!(
            "attribute '{name}' type mismatch: expected {} but found {}",
            expected.to_lowercase(),
            found.kind()
        ))
    }
}
