use tessera_types::{NodeId, Result, TesseraError};

use crate::Tuple;

/// Bidirectional permutation between canonical field order and one index's
/// storage order, built from order descriptions such as `"SPO"` → `"POS"`.
#[derive(Clone, Debug)]
pub struct TupleMap {
    label: String,
    /// Storage slot j holds canonical field `fetch[j]`.
    fetch: Vec<usize>,
    /// Canonical field i is stored at slot `put[i]`.
    put: Vec<usize>,
}

impl TupleMap {
    pub fn create(primary: &str, order: &str) -> Result<TupleMap> {
        if primary.len() != order.len() || primary.is_empty() {
            return Err(TesseraError::Invalid("tuple order length mismatch"));
        }
        let arity = primary.len();
        let mut fetch = vec![usize::MAX; arity];
        let mut put = vec![usize::MAX; arity];
        for (j, ch) in order.chars().enumerate() {
            let i = primary
                .chars()
                .position(|p| p == ch)
                .ok_or(TesseraError::Invalid("tuple order is not a permutation"))?;
            if put[i] != usize::MAX {
                return Err(TesseraError::Invalid("tuple order repeats a field"));
            }
            fetch[j] = i;
            put[i] = j;
        }
        Ok(TupleMap {
            label: format!("{primary}->{order}"),
            fetch,
            put,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn arity(&self) -> usize {
        self.fetch.len()
    }

    /// Storage slot of canonical field `i`.
    pub fn map_slot(&self, i: usize) -> usize {
        self.put[i]
    }

    /// Canonical field held in storage slot `j`.
    pub fn unmap_slot(&self, j: usize) -> usize {
        self.fetch[j]
    }

    /// Permute a canonical tuple into storage order.
    pub fn map_tuple(&self, src: &[NodeId]) -> Tuple {
        assert_eq!(src.len(), self.arity(), "tuple arity does not match map");
        self.fetch.iter().map(|&i| src[i]).collect()
    }

    /// Permute a storage-order tuple back to canonical order.
    pub fn unmap_tuple(&self, src: &[NodeId]) -> Tuple {
        assert_eq!(src.len(), self.arity(), "tuple arity does not match map");
        self.put.iter().map(|&j| src[j]).collect()
    }
}
