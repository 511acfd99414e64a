use tessera_records::{KeySearch, RecordBufferIterator, RecordDesc, SortedRecordBuffer};
use tessera_types::{NodeId, Result, TesseraError};

use crate::map::TupleMap;
use crate::Tuple;

/// One ordered store per field permutation (SPO, POS, OSP, ...), keyed by
/// the tuple permuted into this index's storage order.
pub struct TupleIndex {
    name: String,
    arity: usize,
    map: TupleMap,
    store: SortedRecordBuffer,
}

impl TupleIndex {
    /// `primary` names the canonical field order ("SPO", "GSPO"), `order`
    /// this index's storage order.
    pub fn new(primary: &str, order: &str, capacity: usize) -> Result<TupleIndex> {
        let map = TupleMap::create(primary, order)?;
        let arity = map.arity();
        let desc = RecordDesc::key_only(arity * NodeId::SIZE)?;
        Ok(TupleIndex {
            name: order.to_string(),
            arity,
            map,
            store: SortedRecordBuffer::new(desc, capacity),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn check_tuple(&self, tuple: &[NodeId]) -> Result<()> {
        if tuple.len() != self.arity {
            return Err(TesseraError::Invalid("tuple arity mismatch"));
        }
        if tuple.iter().any(|id| id.is_any()) {
            return Err(TesseraError::Invalid("stored tuple contains the wildcard id"));
        }
        Ok(())
    }

    fn check_pattern(&self, pattern: &[NodeId]) -> Result<()> {
        if pattern.len() != self.arity {
            return Err(TesseraError::Invalid("pattern arity mismatch"));
        }
        Ok(())
    }

    fn encode_key(&self, mapped: &[NodeId]) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.arity * NodeId::SIZE);
        for id in mapped {
            key.extend_from_slice(&id.to_bytes());
        }
        key
    }

    /// Insert a tuple. Re-adding a tuple already present is a no-op
    /// returning `false`.
    pub fn add(&mut self, tuple: &[NodeId]) -> Result<bool> {
        self.check_tuple(tuple)?;
        let mapped = self.map.map_tuple(tuple);
        let key = self.encode_key(&mapped);
        match self.store.find(&key) {
            KeySearch::Found(_) => Ok(false),
            KeySearch::Insertion(idx) => {
                let record = self.store.desc().key_record(&key)?;
                self.store.insert_at(idx, &record);
                Ok(true)
            }
        }
    }

    /// Remove a tuple; `false` when it was not present.
    pub fn delete(&mut self, tuple: &[NodeId]) -> Result<bool> {
        self.check_tuple(tuple)?;
        let mapped = self.map.map_tuple(tuple);
        let key = self.encode_key(&mapped);
        Ok(self.store.remove_by_key(&key))
    }

    /// Number of leading bound pattern fields in this index's storage order
    /// — the planner metric.
    pub fn prefix_weight(&self, pattern: &[NodeId]) -> Result<usize> {
        self.check_pattern(pattern)?;
        let mapped = self.map.map_tuple(pattern);
        Ok(leading_bound(&mapped))
    }

    /// Serve the pattern as a pure prefix scan, or `None` when its bound
    /// fields do not form a contiguous prefix of this index's storage
    /// order. A fully wildcard pattern is a full scan; fully bound yields
    /// at most one tuple. `None` is control flow, not an error.
    pub fn find_by_index(&self, pattern: &[NodeId]) -> Result<Option<TupleIter<'_>>> {
        self.check_pattern(pattern)?;
        let mapped = self.map.map_tuple(pattern);
        let prefix = leading_bound(&mapped);
        if mapped[prefix..].iter().any(|id| id.is_concrete()) {
            return Ok(None);
        }
        Ok(Some(self.scan(&mapped, prefix, false)))
    }

    /// Prefix scan over the leading bound run, filtering any remaining
    /// bound fields by equality. `None` only when even the first storage
    /// field is unbound.
    pub fn find_or_partial_scan(&self, pattern: &[NodeId]) -> Result<Option<TupleIter<'_>>> {
        self.check_pattern(pattern)?;
        let mapped = self.map.map_tuple(pattern);
        let prefix = leading_bound(&mapped);
        if prefix == 0 {
            return Ok(None);
        }
        Ok(Some(self.scan(&mapped, prefix, true)))
    }

    /// Always serves the pattern: best achievable prefix scan, degrading to
    /// a full scan with every bound field filtered in software.
    pub fn find_or_scan(&self, pattern: &[NodeId]) -> Result<TupleIter<'_>> {
        self.check_pattern(pattern)?;
        let mapped = self.map.map_tuple(pattern);
        let prefix = leading_bound(&mapped);
        Ok(self.scan(&mapped, prefix, true))
    }

    fn scan(&self, mapped: &[NodeId], prefix: usize, filtered: bool) -> TupleIter<'_> {
        let filter = if filtered && mapped[prefix..].iter().any(|id| id.is_concrete()) {
            Some(mapped.iter().copied().collect())
        } else {
            None
        };
        let (min, max) = self.prefix_bounds(mapped, prefix);
        let inner = self.store.iter_range(min.as_deref(), max.as_deref());
        TupleIter {
            inner,
            map: &self.map,
            filter,
        }
    }

    /// Half-open key range covering every key starting with the bound
    /// prefix: low is the prefix zero-padded, high the prefix incremented
    /// as one big-endian integer. A prefix of all-ones has no upper bound.
    fn prefix_bounds(&self, mapped: &[NodeId], prefix: usize) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
        if prefix == 0 {
            return (None, None);
        }
        let key_len = self.arity * NodeId::SIZE;
        let mut low = vec![0u8; key_len];
        for (j, id) in mapped[..prefix].iter().enumerate() {
            low[j * NodeId::SIZE..(j + 1) * NodeId::SIZE].copy_from_slice(&id.to_bytes());
        }
        let mut high = low.clone();
        let mut carry = true;
        for byte in high[..prefix * NodeId::SIZE].iter_mut().rev() {
            if *byte == 0xFF {
                *byte = 0;
            } else {
                *byte += 1;
                carry = false;
                break;
            }
        }
        let high = if carry { None } else { Some(high) };
        (Some(low), high)
    }
}

fn leading_bound(mapped: &[NodeId]) -> usize {
    mapped.iter().take_while(|id| id.is_concrete()).count()
}

fn decode_key(key: &[u8]) -> Tuple {
    key.chunks_exact(NodeId::SIZE)
        .map(|chunk| NodeId::decode(chunk).expect("chunk is id-sized"))
        .collect()
}

/// Lazy match scan over one tuple index; yields tuples un-permuted back to
/// canonical field order.
pub struct TupleIter<'a> {
    inner: RecordBufferIterator<'a>,
    map: &'a TupleMap,
    /// Storage-order pattern applied as an equality filter; wildcard slots
    /// match anything.
    filter: Option<Tuple>,
}

impl Iterator for TupleIter<'_> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        for record in self.inner.by_ref() {
            let stored = decode_key(record.key());
            if let Some(filter) = &self.filter {
                let hit = filter
                    .iter()
                    .zip(stored.iter())
                    .all(|(p, s)| p.is_any() || p == s);
                if !hit {
                    continue;
                }
            }
            return Some(self.map.unmap_tuple(&stored));
        }
        None
    }
}
