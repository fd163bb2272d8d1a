//! YAML description of one or more methods to compile.
//!
//! ```yaml
//! fields:
//!   - { token: 67108865, name: counter, type: int64 }
//! methods:
//!   - name: Add
//!     parameters: [int32, int32]
//!     returns: int32
//!     code: "02 03 58 2a"
//! ```

use std::path::Path;

use cil_ir::{ClrType, FieldInfo, FieldTable, MethodInfo};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid method file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("method {method}: bad hex byte {text:?}")]
    Hex { method: String, text: String },
}

#[derive(Debug, Deserialize)]
struct RawMethod {
    name: String,
    #[serde(default)]
    parameters: Vec<ClrType>,
    #[serde(default)]
    locals: Vec<ClrType>,
    #[serde(default)]
    returns: Option<ClrType>,
    /// Whitespace-separated hex bytes.
    code: String,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default)]
    fields: Vec<FieldInfo>,
    methods: Vec<RawMethod>,
}

#[derive(Debug)]
pub struct MethodFile {
    pub fields: FieldTable,
    pub methods: Vec<MethodInfo>,
}

impl MethodFile {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let raw: RawFile = serde_yaml::from_str(text)?;
        let methods = raw
            .methods
            .into_iter()
            .map(|m| {
                let body = parse_hex(&m.name, &m.code)?;
                let mut method = MethodInfo::new(m.name, body)
                    .with_parameters(&m.parameters)
                    .with_locals(&m.locals);
                method.return_type = m.returns;
                Ok(method)
            })
            .collect::<Result<Vec<_>, LoadError>>()?;
        Ok(MethodFile {
            fields: raw.fields.into_iter().collect(),
            methods,
        })
    }
}

fn parse_hex(method: &str, code: &str) -> Result<Vec<u8>, LoadError> {
    code.split_whitespace()
        .map(|byte| {
            u8::from_str_radix(byte, 16).map_err(|_| LoadError::Hex {
                method: method.to_string(),
                text: byte.to_string(),
            })
        })
        .collect()
}
