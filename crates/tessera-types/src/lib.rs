#![forbid(unsafe_code)]

use std::fmt;

/// Fixed-width id standing in for an interned RDF term. The id↔term codec
/// lives in the node table layer; this core only orders and stores ids.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Encoded width in bytes.
    pub const SIZE: usize = 8;

    /// Reserved wildcard: "unbound" in a query pattern. Never a valid term id.
    pub const ANY: NodeId = NodeId(u64::MAX);

    pub fn is_any(self) -> bool {
        self == Self::ANY
    }

    pub fn is_concrete(self) -> bool {
        !self.is_any()
    }

    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        NodeId(u64::from_be_bytes(bytes))
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < Self::SIZE {
            return Err(TesseraError::Corruption("node id truncated"));
        }
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(&src[..Self::SIZE]);
        Ok(Self::from_bytes(arr))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            write!(f, "ANY")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TesseraError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("corruption: {0}")]
    Corruption(&'static str),
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    #[error("not found")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, TesseraError>;
