//! Method metadata consumed by the front end.

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::ClrType;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ParameterInfo {
    pub position: u16,
    #[serde(rename = "type")]
    pub ty: ClrType,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LocalVariableInfo {
    pub index: u16,
    #[serde(rename = "type")]
    pub ty: ClrType,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FieldInfo {
    pub token: u32,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ClrType,
}

/// A single method to compile: its IL body and signature.
#[derive(Clone, Debug, Default)]
pub struct MethodInfo {
    pub name: String,
    pub body: Vec<u8>,
    pub parameters: Vec<ParameterInfo>,
    pub locals: Vec<LocalVariableInfo>,
    pub return_type: Option<ClrType>,
}

impl MethodInfo {
    pub fn new(name: impl Into<String>, body: Vec<u8>) -> Self {
        MethodInfo {
            name: name.into(),
            body,
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, types: &[ClrType]) -> Self {
        self.parameters = types
            .iter()
            .zip(0u16..)
            .map(|(&ty, position)| ParameterInfo { position, ty })
            .collect();
        self
    }

    pub fn with_locals(mut self, types: &[ClrType]) -> Self {
        self.locals = types
            .iter()
            .zip(0u16..)
            .map(|(&ty, index)| LocalVariableInfo { index, ty })
            .collect();
        self
    }

    pub fn parameter(&self, position: u16) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|p| p.position == position)
    }

    pub fn local(&self, index: u16) -> Option<&LocalVariableInfo> {
        self.locals.iter().find(|l| l.index == index)
    }
}

/// Runtime metadata queries needed while compiling a method.
pub trait RuntimeInformation {
    /// Resolve an in-method field token.
    fn field(&self, token: u32) -> Option<&FieldInfo>;
}

/// In-memory [`RuntimeInformation`] backed by a token map.
#[derive(Clone, Debug, Default)]
pub struct FieldTable {
    fields: HashMap<u32, FieldInfo>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FieldInfo) -> Option<FieldInfo> {
        self.fields.insert(field.token, field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldInfo> for FieldTable {
    fn from_iter<I: IntoIterator<Item = FieldInfo>>(iter: I) -> Self {
        let mut table = FieldTable::new();
        for field in iter {
            table.insert(field);
        }
        table
    }
}

impl RuntimeInformation for FieldTable {
    fn field(&self, token: u32) -> Option<&FieldInfo> {
        self.fields.get(&token)
    }
}
