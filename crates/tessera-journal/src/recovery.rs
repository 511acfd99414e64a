//! Replay driver for crash recovery.
//!
//! Entries accumulate into a batch until a COMMIT marker applies them or an
//! ABORT marker discards them; a trailing batch with no marker never became
//! durable and is discarded too. Applying the entries to the index
//! structures belongs to the owning transaction layer, which supplies the
//! `apply` callback and resets the journal after a successful replay.

use tracing::{info, warn};

use tessera_types::Result;

use crate::entry::{JournalEntry, JournalEntryType};
use crate::journal::Journal;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReplayStats {
    /// COMMIT markers seen.
    pub committed: usize,
    /// REDO entries handed to the apply callback.
    pub applied: usize,
    /// Entries discarded by an ABORT marker or left uncommitted at the end.
    pub discarded: usize,
}

/// Replay committed batches of REDO entries through `apply`, in journal
/// order. UNDO entries are not replayed.
pub fn replay<F>(journal: &Journal, mut apply: F) -> Result<ReplayStats>
where
    F: FnMut(&JournalEntry) -> Result<()>,
{
    let mut stats = ReplayStats::default();
    let mut batch: Vec<JournalEntry> = Vec::new();
    let mut iter = journal.entries();
    let mut seen = 0usize;
    while let Some(entry) = iter.next_entry()? {
        seen += 1;
        match entry.entry_type {
            JournalEntryType::Abort => {
                stats.discarded += batch.len();
                batch.clear();
            }
            JournalEntryType::Commit => {
                for buffered in batch.drain(..) {
                    if buffered.entry_type == JournalEntryType::Undo {
                        warn!(
                            position = buffered.position,
                            "journal.recovery.undo_skipped"
                        );
                        continue;
                    }
                    apply(&buffered)?;
                    stats.applied += 1;
                }
                stats.committed += 1;
            }
            JournalEntryType::Redo | JournalEntryType::Undo => batch.push(entry),
        }
    }
    stats.discarded += batch.len();
    if seen > 0 {
        info!(
            committed = stats.committed,
            applied = stats.applied,
            discarded = stats.discarded,
            "journal.recovery.done"
        );
    }
    Ok(stats)
}
