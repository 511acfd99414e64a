use std::fmt;

use tessera_types::{Result, TesseraError};

/// Fixed width of a component id on disk.
pub const COMPONENT_ID_LEN: usize = 16;

/// Fixed journal entry header length.
pub const HEADER_LEN: usize = 28;

/// Byte offsets of the fixed header fields. All integers big-endian.
pub mod header {
    use core::ops::Range;

    pub const LENGTH: Range<usize> = 0..4;
    pub const CHECKSUM: Range<usize> = 4..8;
    pub const TYPE: Range<usize> = 8..12;
    pub const COMPONENT: Range<usize> = 12..28;
}

/// Opaque fixed-size tag naming the storage subsystem a journal entry
/// belongs to. The all-zero id is reserved for the journal's own
/// commit/abort markers.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ComponentId([u8; COMPONENT_ID_LEN]);

impl ComponentId {
    pub const SYSTEM: ComponentId = ComponentId([0; COMPONENT_ID_LEN]);

    pub const fn new(bytes: [u8; COMPONENT_ID_LEN]) -> Self {
        ComponentId(bytes)
    }

    pub fn bytes(&self) -> &[u8; COMPONENT_ID_LEN] {
        &self.0
    }

    pub fn is_system(&self) -> bool {
        *self == Self::SYSTEM
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < COMPONENT_ID_LEN {
            return Err(TesseraError::Corruption("component id truncated"));
        }
        let mut bytes = [0u8; COMPONENT_ID_LEN];
        bytes.copy_from_slice(&src[..COMPONENT_ID_LEN]);
        Ok(ComponentId(bytes))
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Journal entry kinds. The on-disk codes are stable and never renumbered.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JournalEntryType {
    Redo = 1,
    Undo = 2,
    Commit = 3,
    Abort = 4,
}

impl JournalEntryType {
    pub const fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for JournalEntryType {
    type Error = TesseraError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(JournalEntryType::Redo),
            2 => Ok(JournalEntryType::Undo),
            3 => Ok(JournalEntryType::Commit),
            4 => Ok(JournalEntryType::Abort),
            _ => Err(TesseraError::Corruption("unknown journal entry type")),
        }
    }
}

/// One decoded journal entry. Positions are journal byte offsets assigned
/// when the entry is written or read back.
#[derive(Clone, Debug)]
pub struct JournalEntry {
    pub entry_type: JournalEntryType,
    pub component: ComponentId,
    pub payload: Vec<u8>,
    pub position: u64,
    pub end_position: u64,
}
