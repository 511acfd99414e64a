use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use tessera_checksum::adler32;
use tessera_io::{FileIo, StdFileIo};
use tessera_types::{Result, TesseraError};

use crate::entry::{header, ComponentId, JournalEntry, JournalEntryType, HEADER_LEN};

/// Well-known journal file name under a store location.
pub const JOURNAL_FILE_NAME: &str = "journal.jrn";

struct JournalState {
    /// Append position; also the logical end for entry iteration.
    position: u64,
    /// Position recorded by `start_write`; cleared on commit.
    cycle_start: Option<u64>,
    cycle_ended: bool,
}

/// Append-only, checksum-protected write-ahead log.
///
/// Entries are immutable once written; the only rewind is truncation back
/// to a write-cycle start during abort/reopen, or a full `reset`. `write`
/// and the entry-read primitive share one critical section; concurrent
/// writers must be externally serialized.
pub struct Journal {
    io: Arc<dyn FileIo>,
    state: Mutex<JournalState>,
}

impl Journal {
    pub fn open(io: Arc<dyn FileIo>) -> Result<Journal> {
        let position = io.len()?;
        Ok(Journal {
            io,
            state: Mutex::new(JournalState {
                position,
                cycle_start: None,
                cycle_ended: false,
            }),
        })
    }

    /// Open (creating if absent) the journal file under a store location.
    pub fn open_location(location: &Path) -> Result<Journal> {
        let io = StdFileIo::open(&location.join(JOURNAL_FILE_NAME))?;
        Journal::open(Arc::new(io))
    }

    /// Whether a journal file exists under a store location.
    pub fn exists(location: &Path) -> bool {
        location.join(JOURNAL_FILE_NAME).exists()
    }

    /// Current append position.
    pub fn position(&self) -> u64 {
        self.state.lock().position
    }

    /// Physical size of the journal channel.
    pub fn size(&self) -> Result<u64> {
        self.io.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    pub fn sync(&self) -> Result<()> {
        self.io.sync_all()
    }

    /// Append one entry; returns its starting position.
    pub fn write(
        &self,
        entry_type: JournalEntryType,
        component: ComponentId,
        payload: &[u8],
    ) -> Result<u64> {
        if payload.len() > u32::MAX as usize {
            return Err(TesseraError::Invalid("journal payload too large"));
        }
        let mut state = self.state.lock();
        let start = state.position;
        let mut hdr = [0u8; HEADER_LEN];
        hdr[header::LENGTH].copy_from_slice(&(payload.len() as u32).to_be_bytes());
        hdr[header::TYPE].copy_from_slice(&entry_type.code().to_be_bytes());
        hdr[header::COMPONENT].copy_from_slice(component.bytes());
        // Checksum over the header with a zeroed checksum field, then the
        // payload; patched into place before anything hits the channel.
        let sum = adler32(&[&hdr, payload]);
        hdr[header::CHECKSUM].copy_from_slice(&sum.to_be_bytes());
        self.io.write_at(start, &hdr)?;
        self.io.write_at(start + HEADER_LEN as u64, payload)?;
        state.position = start + (HEADER_LEN + payload.len()) as u64;
        Ok(start)
    }

    /// Zero-payload commit marker under the system component id.
    pub fn write_commit(&self) -> Result<u64> {
        self.write(JournalEntryType::Commit, ComponentId::SYSTEM, &[])
    }

    /// Zero-payload abort marker under the system component id.
    pub fn write_abort(&self) -> Result<u64> {
        self.write(JournalEntryType::Abort, ComponentId::SYSTEM, &[])
    }

    /// Read and verify the entry starting at `position`.
    pub fn read_entry(&self, position: u64) -> Result<JournalEntry> {
        let state = self.state.lock();
        let end = state.position;
        self.read_entry_locked(position, end)
    }

    fn read_entry_locked(&self, position: u64, end: u64) -> Result<JournalEntry> {
        if position + HEADER_LEN as u64 > end {
            return Err(TesseraError::Corruption("journal entry header truncated"));
        }
        let mut hdr = [0u8; HEADER_LEN];
        self.io.read_at(position, &mut hdr).map_err(map_short_read)?;
        let len = u32::from_be_bytes(hdr[header::LENGTH].try_into().unwrap()) as usize;
        let stored = u32::from_be_bytes(hdr[header::CHECKSUM].try_into().unwrap());
        let end_position = position + (HEADER_LEN + len) as u64;
        if end_position > end {
            return Err(TesseraError::Corruption("journal entry payload truncated"));
        }
        let mut payload = vec![0u8; len];
        self.io
            .read_at(position + HEADER_LEN as u64, &mut payload)
            .map_err(map_short_read)?;
        let mut unchecked = hdr;
        unchecked[header::CHECKSUM].fill(0);
        if adler32(&[&unchecked, &payload]) != stored {
            return Err(TesseraError::Corruption("journal entry checksum mismatch"));
        }
        let entry_type =
            JournalEntryType::try_from(u32::from_be_bytes(hdr[header::TYPE].try_into().unwrap()))?;
        let component = ComponentId::decode(&hdr[header::COMPONENT])?;
        Ok(JournalEntry {
            entry_type,
            component,
            payload,
            position,
            end_position,
        })
    }

    /// Forward-only, non-restartable scan of all entries up to the end
    /// observed now.
    pub fn entries(&self) -> JournalEntries<'_> {
        self.entries_from(0)
    }

    /// Forward-only scan starting at an entry position.
    pub fn entries_from(&self, position: u64) -> JournalEntries<'_> {
        JournalEntries {
            journal: self,
            position,
            end: self.position(),
        }
    }

    /// Open a write cycle: remember the current position so an abort can
    /// rewind to it.
    pub fn start_write(&self) {
        let mut state = self.state.lock();
        state.cycle_start = Some(state.position);
        state.cycle_ended = false;
    }

    /// Close the cycle as committed and force the channel to durable
    /// storage.
    pub fn commit_write(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.cycle_start = None;
        state.cycle_ended = true;
        self.io.sync_all()
    }

    /// Discard the open cycle: truncate back to its start position.
    /// Idempotent; a no-op when the cycle already ended.
    pub fn abort_write(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.abort_locked(&mut state)
    }

    fn abort_locked(&self, state: &mut JournalState) -> Result<()> {
        if !state.cycle_ended {
            if let Some(start) = state.cycle_start {
                debug!(
                    from = state.position,
                    to = start,
                    "journal.abort.truncate"
                );
                self.io.truncate(start)?;
                self.io.sync_all()?;
                state.position = start;
            }
        }
        state.cycle_ended = true;
        Ok(())
    }

    /// End the cycle: abort it when it never committed, then reset cycle
    /// tracking.
    pub fn end_write(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.cycle_ended {
            self.abort_locked(&mut state)?;
        }
        state.cycle_start = None;
        state.cycle_ended = false;
        Ok(())
    }

    /// Re-derive position after an external forced close: an still-active
    /// write-start marker is truncated away; otherwise adopt the channel's
    /// physical size.
    pub fn reopen(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.cycle_start {
            Some(start) if !state.cycle_ended => {
                debug!(to = start, "journal.reopen.truncate");
                self.io.truncate(start)?;
                self.io.sync_all()?;
                state.position = start;
            }
            _ => {
                state.position = self.io.len()?;
            }
        }
        state.cycle_start = None;
        state.cycle_ended = false;
        Ok(())
    }

    /// Truncate the journal to empty. Post-recovery housekeeping for the
    /// owning transaction layer.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.io.truncate(0)?;
        self.io.sync_all()?;
        state.position = 0;
        state.cycle_start = None;
        state.cycle_ended = false;
        Ok(())
    }
}

fn map_short_read(err: TesseraError) -> TesseraError {
    match err {
        TesseraError::Io(ref io_err)
            if io_err.kind() == std::io::ErrorKind::UnexpectedEof =>
        {
            TesseraError::Corruption("journal entry short read")
        }
        other => other,
    }
}

/// Lazy forward-only entry scan. The end is captured at creation; entries
/// written afterwards are not observed.
pub struct JournalEntries<'a> {
    journal: &'a Journal,
    position: u64,
    end: u64,
}

impl JournalEntries<'_> {
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>> {
        if self.position >= self.end {
            return Ok(None);
        }
        let entry = {
            // Entry reads share the writer's critical section.
            let _state = self.journal.state.lock();
            self.journal.read_entry_locked(self.position, self.end)?
        };
        self.position = entry.end_position;
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn component(tag: u8) -> ComponentId {
        let mut bytes = [0u8; crate::COMPONENT_ID_LEN];
        bytes[0] = tag;
        ComponentId::new(bytes)
    }

    fn open_journal(dir: &Path, name: &str) -> (Journal, StdFileIo) {
        let io = StdFileIo::open(&dir.join(name)).expect("open journal file");
        let journal = Journal::open(Arc::new(io.clone())).expect("open journal");
        (journal, io)
    }

    #[test]
    fn write_then_read_roundtrip() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "roundtrip");
        let pos = journal.write(JournalEntryType::Redo, component(7), b"payload-bytes")?;
        assert_eq!(pos, 0);
        let entry = journal.read_entry(pos)?;
        assert_eq!(entry.entry_type, JournalEntryType::Redo);
        assert_eq!(entry.component, component(7));
        assert_eq!(entry.payload, b"payload-bytes");
        assert_eq!(entry.position, 0);
        assert_eq!(entry.end_position, (HEADER_LEN + 13) as u64);
        Ok(())
    }

    #[test]
    fn positions_advance_by_header_plus_payload() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "positions");
        let first = journal.write(JournalEntryType::Redo, component(1), &[0xAA; 10])?;
        let second = journal.write(JournalEntryType::Undo, component(2), &[0xBB; 3])?;
        assert_eq!(first, 0);
        assert_eq!(second, (HEADER_LEN + 10) as u64);
        assert_eq!(journal.position(), (2 * HEADER_LEN + 13) as u64);
        Ok(())
    }

    #[test]
    fn payload_bit_flip_is_detected() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, io) = open_journal(dir.path(), "bitflip");
        let pos = journal.write(JournalEntryType::Redo, component(3), &[0x55; 32])?;
        journal.sync()?;
        // Flip one bit in the middle of the payload.
        let offset = pos + HEADER_LEN as u64 + 16;
        let mut byte = [0u8; 1];
        io.read_at(offset, &mut byte)?;
        byte[0] ^= 0x01;
        io.write_at(offset, &byte)?;
        match journal.read_entry(pos) {
            Err(TesseraError::Corruption(_)) => Ok(()),
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn header_type_garbage_is_corruption() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, io) = open_journal(dir.path(), "badtype");
        let pos = journal.write(JournalEntryType::Commit, ComponentId::SYSTEM, &[])?;
        io.write_at(pos + 11, &[9u8])?;
        assert!(matches!(
            journal.read_entry(pos),
            Err(TesseraError::Corruption(_))
        ));
        Ok(())
    }

    #[test]
    fn entries_iterate_in_write_order() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "iterate");
        journal.write(JournalEntryType::Redo, component(1), b"one")?;
        journal.write(JournalEntryType::Redo, component(2), b"two")?;
        journal.write_commit()?;
        let mut iter = journal.entries();
        let first = iter.next_entry()?.expect("first entry");
        assert_eq!(first.payload, b"one");
        let second = iter.next_entry()?.expect("second entry");
        assert_eq!(second.payload, b"two");
        let marker = iter.next_entry()?.expect("commit marker");
        assert_eq!(marker.entry_type, JournalEntryType::Commit);
        assert!(marker.component.is_system());
        assert!(marker.payload.is_empty());
        assert!(iter.next_entry()?.is_none());
        Ok(())
    }

    #[test]
    fn iteration_end_is_snapshotted() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "snapshot");
        journal.write(JournalEntryType::Redo, component(1), b"seen")?;
        let mut iter = journal.entries();
        journal.write(JournalEntryType::Redo, component(1), b"unseen")?;
        assert_eq!(iter.next_entry()?.expect("entry").payload, b"seen");
        assert!(iter.next_entry()?.is_none());
        Ok(())
    }

    #[test]
    fn abort_truncates_to_cycle_start_and_is_idempotent() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "abort");
        journal.write(JournalEntryType::Redo, component(1), b"keep")?;
        let before = journal.position();
        journal.start_write();
        journal.write(JournalEntryType::Redo, component(1), b"discard-1")?;
        journal.write(JournalEntryType::Redo, component(1), b"discard-2")?;
        journal.abort_write()?;
        assert_eq!(journal.position(), before);
        assert_eq!(journal.size()?, before);
        journal.abort_write()?;
        assert_eq!(journal.size()?, before);
        Ok(())
    }

    #[test]
    fn commit_keeps_the_cycle() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "commit");
        journal.start_write();
        journal.write(JournalEntryType::Redo, component(1), b"kept")?;
        journal.write_commit()?;
        journal.commit_write()?;
        journal.end_write()?;
        let mut iter = journal.entries();
        assert_eq!(iter.next_entry()?.expect("entry").payload, b"kept");
        assert_eq!(
            iter.next_entry()?.expect("marker").entry_type,
            JournalEntryType::Commit
        );
        Ok(())
    }

    #[test]
    fn end_write_aborts_an_uncommitted_cycle() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "endwrite");
        let before = journal.position();
        journal.start_write();
        journal.write(JournalEntryType::Redo, component(1), b"never committed")?;
        journal.end_write()?;
        assert_eq!(journal.size()?, before);
        Ok(())
    }

    #[test]
    fn reopen_discards_an_incomplete_cycle() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "reopen_active");
        journal.write(JournalEntryType::Redo, component(1), b"durable")?;
        let before = journal.position();
        journal.start_write();
        journal.write(JournalEntryType::Redo, component(1), b"in flight")?;
        journal.reopen()?;
        assert_eq!(journal.position(), before);
        assert_eq!(journal.size()?, before);
        Ok(())
    }

    #[test]
    fn reopen_adopts_physical_size_without_a_cycle() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, io) = open_journal(dir.path(), "reopen_idle");
        journal.write(JournalEntryType::Redo, component(1), b"data")?;
        let len = io.len()?;
        journal.reopen()?;
        assert_eq!(journal.position(), len);
        Ok(())
    }

    #[test]
    fn reset_empties_the_journal() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        let (journal, _io) = open_journal(dir.path(), "reset");
        journal.write(JournalEntryType::Redo, component(1), b"old")?;
        journal.reset()?;
        assert!(journal.is_empty()?);
        assert_eq!(journal.position(), 0);
        Ok(())
    }

    #[test]
    fn open_location_uses_the_well_known_name() -> Result<()> {
        let dir = tempdir().expect("tmpdir");
        assert!(!Journal::exists(dir.path()));
        let journal = Journal::open_location(dir.path())?;
        journal.write(JournalEntryType::Redo, component(1), b"x")?;
        assert!(Journal::exists(dir.path()));
        assert!(dir.path().join(JOURNAL_FILE_NAME).is_file());
        Ok(())
    }
}
