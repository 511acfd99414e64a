use tessera_types::{Result, TesseraError};

/// Shape of the fixed-width records a buffer stores: a key of `key_len`
/// bytes followed by an optional value of `value_len` bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RecordDesc {
    key_len: usize,
    value_len: usize,
}

impl RecordDesc {
    pub fn new(key_len: usize, value_len: usize) -> Result<Self> {
        if key_len == 0 {
            return Err(TesseraError::Invalid("record key length must be non-zero"));
        }
        Ok(Self { key_len, value_len })
    }

    pub fn key_only(key_len: usize) -> Result<Self> {
        Self::new(key_len, 0)
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn value_len(&self) -> usize {
        self.value_len
    }

    /// Bytes one record occupies in a buffer slot.
    pub fn slot_len(&self) -> usize {
        self.key_len + self.value_len
    }

    pub fn record(&self, key: &[u8], value: &[u8]) -> Result<Record> {
        if key.len() != self.key_len {
            return Err(TesseraError::Invalid("record key length mismatch"));
        }
        if value.len() != self.value_len {
            return Err(TesseraError::Invalid("record value length mismatch"));
        }
        Ok(Record {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    pub fn key_record(&self, key: &[u8]) -> Result<Record> {
        self.record(key, &[])
    }
}

/// One fixed-width record. Records order by their key bytes,
/// lexicographically.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl Record {
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Value bytes; empty for key-only record shapes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}
