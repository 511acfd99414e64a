#![forbid(unsafe_code)]

/// Incremental checksum over byte chunks.
pub trait Checksum {
    fn update(&mut self, bytes: &[u8]);
    fn finalize(&self) -> u32;
    fn reset(&mut self);
}

/// Adler-32, the checksum the journal entry format carries on disk.
#[derive(Clone)]
pub struct Adler32 {
    inner: adler2::Adler32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self {
            inner: adler2::Adler32::new(),
        }
    }
}

impl Checksum for Adler32 {
    fn update(&mut self, bytes: &[u8]) {
        self.inner.write_slice(bytes);
    }

    fn finalize(&self) -> u32 {
        self.inner.checksum()
    }

    fn reset(&mut self) {
        self.inner = adler2::Adler32::new();
    }
}

/// One-shot Adler-32 over a sequence of chunks.
pub fn adler32(chunks: &[&[u8]]) -> u32 {
    let mut hasher = Adler32::default();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // RFC 1950 test value.
        assert_eq!(adler32(&[b"Wikipedia"]), 0x11E6_0398);
    }

    #[test]
    fn chunking_does_not_change_result() {
        let whole = adler32(&[b"journal entry payload"]);
        let split = adler32(&[b"journal ", b"entry ", b"payload"]);
        assert_eq!(whole, split);
    }

    #[test]
    fn empty_input_is_one() {
        assert_eq!(adler32(&[]), 1);
    }

    #[test]
    fn reset_restarts_the_sum() {
        let mut hasher = Adler32::default();
        hasher.update(b"stale");
        hasher.reset();
        hasher.update(b"Wikipedia");
        assert_eq!(hasher.finalize(), 0x11E6_0398);
    }
}
