//! Catalog object descriptors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::signature;

/// Kind of schema object that can be dumped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Table,
    View,
    Function,
    Procedure,
    Sequence,
    Pipe,
}

impl ObjectKind {
    /// All kinds, in the order the catalog query unions them
    pub const ALL: [ObjectKind; 6] = [
        Self::Table,
        Self::View,
        Self::Function,
        Self::Procedure,
        Self::Sequence,
        Self::Pipe,
    ];

    /// Catalog spelling, also the first argument of `GET_DDL`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::Sequence => "SEQUENCE",
            Self::Pipe => "PIPE",
        }
    }

    /// Output folder segment for this kind
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Table => "tables",
            Self::View => "views",
            Self::Function => "functions",
            Self::Procedure => "procedures",
            Self::Sequence => "sequences",
            Self::Pipe => "pipes",
        }
    }

    /// Functions and procedures can be overloaded and carry a signature
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Procedure)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown object kind string returned by the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown object kind: {0}")]
pub struct UnknownObjectKind(pub String);

impl FromStr for ObjectKind {
    type Err = UnknownObjectKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == upper)
            .ok_or_else(|| UnknownObjectKind(s.to_string()))
    }
}

/// A single object found in a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    /// Object name as stored in the catalog
    pub name: String,

    pub kind: ObjectKind,

    /// Signature as rendered by the catalog, e.g. `(A NUMBER, B VARCHAR)`
    pub original_signature: String,

    /// Type-only signature, e.g. `(NUMBER, VARCHAR)`
    pub signature: String,
}

impl SchemaObject {
    /// Build a descriptor, normalizing the signature.
    ///
    /// Signatures are dropped for kinds that cannot be overloaded, whatever
    /// the catalog returned for them.
    pub fn new(name: impl Into<String>, kind: ObjectKind, raw_signature: impl Into<String>) -> Self {
        let raw_signature = raw_signature.into();
        let original_signature = if kind.is_callable() {
            raw_signature.trim().to_string()
        } else {
            String::new()
        };
        let signature = signature::normalize(&original_signature);

        Self {
            name: name.into(),
            kind,
            original_signature,
            signature,
        }
    }

    /// Descriptor for an object without a parameter list
    pub fn plain(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self::new(name, kind, "")
    }

    /// Name used for the output file: callables get their signature appended
    /// so overloads land in distinct files.
    pub fn file_stem(&self) -> String {
        if self.kind.is_callable() {
            format!("{}{}", self.name, self.signature)
        } else {
            self.name.clone()
        }
    }
}

impl fmt::Display for SchemaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} ({})", self.name, self.signature, self.kind)
    }
}

/// Progress of one object through the dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStage {
    Discovered,
    SignatureNormalized,
    DdlFetched,
    PathResolved,
    Written,
}

impl fmt::Display for ObjectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovered => "discovered",
            Self::SignatureNormalized => "signature_normalized",
            Self::DdlFetched => "ddl_fetched",
            Self::PathResolved => "path_resolved",
            Self::Written => "written",
        };
        f.write_str(s)
    }
}
