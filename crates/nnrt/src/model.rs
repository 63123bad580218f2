//! Model snapshots: a graph, its declared opsets and the IR version,
//! serializable to JSON (inspectable) or bincode (compact).

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::Graph;
use crate::opset::OpSet;

/// Oldest model IR revision this engine accepts. Earlier revisions predate
/// the opset-import mechanism resolution relies on.
pub const MIN_IR_VERSION: i64 = 3;

/// A loadable model: the computation graph plus the opset versions its
/// nodes were authored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    ir_version: i64,
    opsets: Vec<OpSet>,
    graph: Graph,
}

#[derive(Debug, Error)]
pub enum ModelSerdeError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("model IR version {found} is not supported; the minimum is {MIN_IR_VERSION}")]
    IrVersion { found: i64 },
}

#[derive(Debug, Error)]
pub enum ModelIoError {
    #[error(transparent)]
    Serialization(#[from] ModelSerdeError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl Model {
    pub fn new(ir_version: i64, opsets: Vec<OpSet>, graph: Graph) -> Result<Self, ModelSerdeError> {
        check_ir_version(ir_version)?;
        Ok(Model {
            ir_version,
            opsets,
            graph,
        })
    }

    pub fn ir_version(&self) -> i64 {
        self.ir_version
    }

    pub fn opsets(&self) -> &[OpSet] {
        &self.opsets
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn to_json_string(&self) -> Result<String, ModelSerdeError> {
        serde_json::to_string_pretty(self).map_err(ModelSerdeError::from)
    }

    pub fn from_json_str(src: &str) -> Result<Self, ModelSerdeError> {
        let model: Model = serde_json::from_str(src).map_err(ModelSerdeError::from)?;
        check_ir_version(model.ir_version)?;
        Ok(model)
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>, ModelSerdeError> {
        bincode::serialize(self).map_err(ModelSerdeError::from)
    }

    pub fn from_bincode_slice(bytes: &[u8]) -> Result<Self, ModelSerdeError> {
        let model: Model = bincode::deserialize(bytes).map_err(ModelSerdeError::from)?;
        check_ir_version(model.ir_version)?;
        Ok(model)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelIoError> {
        let contents = self.to_json_string()?;
        fs::write(path, contents).map_err(ModelIoError::from)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ModelIoError> {
        let contents = fs::read_to_string(path).map_err(ModelIoError::from)?;
        Model::from_json_str(&contents).map_err(ModelIoError::from)
    }

    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelIoError> {
        let bytes = self.to_bincode_bytes()?;
        fs::write(path, bytes).map_err(ModelIoError::from)
    }

    pub fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, ModelIoError> {
        let bytes = fs::read(path).map_err(ModelIoError::from)?;
        Model::from_bincode_slice(&bytes).map_err(ModelIoError::from)
    }
}

fn check_ir_version(version: i64) -> Result<(), ModelSerdeError> {
    if version < MIN_IR_VERSION {
        return Err(ModelSerdeError::IrVersion { found: version });
    }
    Ok(())
}
