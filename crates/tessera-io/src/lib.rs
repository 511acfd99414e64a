#![forbid(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tessera_types::Result;

/// Positional byte channel the journal writes through. Reads must fill the
/// whole buffer; a short read surfaces as `ErrorKind::UnexpectedEof`.
pub trait FileIo: Send + Sync {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()>;
    fn truncate(&self, len: u64) -> Result<()>;
    fn sync_all(&self) -> Result<()>;
    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// `FileIo` over a std file handle. Seek-then-access under one mutex keeps
/// it portable; clones share the same underlying file.
#[derive(Clone)]
pub struct StdFileIo {
    file: Arc<Mutex<File>>,
}

impl StdFileIo {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl FileIo for StdFileIo {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn truncate(&self, len: u64) -> Result<()> {
        let file = self.file.lock();
        file.set_len(len)?;
        Ok(())
    }

    fn sync_all(&self) -> Result<()> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        let file = self.file.lock();
        Ok(file.metadata()?.len())
    }
}
