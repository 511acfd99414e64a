use tracing::trace;

use tessera_types::{NodeId, Result, TesseraError};

use crate::index::{TupleIndex, TupleIter};

/// A set of tuple indexes over the same logical tuple set. Mutations hit
/// every member; queries pick the member whose storage order serves the
/// pattern best. Callers serialize mutation per table.
pub struct TupleTable {
    arity: usize,
    indexes: Vec<TupleIndex>,
}

impl TupleTable {
    pub fn new(arity: usize, indexes: Vec<TupleIndex>) -> Result<TupleTable> {
        if indexes.is_empty() {
            return Err(TesseraError::Invalid("tuple table needs at least one index"));
        }
        if indexes.iter().any(|index| index.arity() != arity) {
            return Err(TesseraError::Invalid("index arity does not match table"));
        }
        Ok(TupleTable { arity, indexes })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn indexes(&self) -> &[TupleIndex] {
        &self.indexes
    }

    pub fn len(&self) -> usize {
        self.indexes[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes[0].is_empty()
    }

    /// Insert into every member index. `false` when the tuple was already
    /// present.
    pub fn add(&mut self, tuple: &[NodeId]) -> Result<bool> {
        let mut added = false;
        for (i, index) in self.indexes.iter_mut().enumerate() {
            let hit = index.add(tuple)?;
            if i == 0 {
                added = hit;
            } else {
                debug_assert_eq!(hit, added, "member indexes diverged on add");
            }
        }
        Ok(added)
    }

    /// Remove from every member index. `false` when the tuple was not
    /// present.
    pub fn delete(&mut self, tuple: &[NodeId]) -> Result<bool> {
        let mut removed = false;
        for (i, index) in self.indexes.iter_mut().enumerate() {
            let hit = index.delete(tuple)?;
            if i == 0 {
                removed = hit;
            } else {
                debug_assert_eq!(hit, removed, "member indexes diverged on delete");
            }
        }
        Ok(removed)
    }

    pub fn contains(&self, tuple: &[NodeId]) -> Result<bool> {
        Ok(self.find(tuple)?.next().is_some())
    }

    /// Match a pattern against the best member index: greatest number of
    /// leading bound fields wins, ties to the first registered. When no
    /// index can serve the pattern as a pure prefix scan, fall back to a
    /// filtered scan on the default (first) index.
    pub fn find(&self, pattern: &[NodeId]) -> Result<TupleIter<'_>> {
        let mut best = 0usize;
        let mut best_weight = self.indexes[0].prefix_weight(pattern)?;
        for (i, index) in self.indexes.iter().enumerate().skip(1) {
            let weight = index.prefix_weight(pattern)?;
            if weight > best_weight {
                best = i;
                best_weight = weight;
            }
        }
        let bound = pattern.iter().filter(|id| id.is_concrete()).count();
        if bound == 0 || best_weight == bound {
            // The winner's prefix covers every bound field, so it cannot
            // refuse the pattern.
            trace!(
                index = %self.indexes[best].name(),
                weight = best_weight,
                "tuple_table.find.prefix_scan"
            );
            let iter = self.indexes[best].find_by_index(pattern)?;
            return Ok(iter.expect("chosen index serves the pattern as a prefix scan"));
        }
        trace!(index = %self.indexes[0].name(), "tuple_table.find.filtered_scan");
        self.indexes[0].find_or_scan(pattern)
    }
}
