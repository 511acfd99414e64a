#![forbid(unsafe_code)]

mod buffer;
mod record;

pub use buffer::{KeySearch, RecordBufferIterator, SortedRecordBuffer};
pub use record::{Record, RecordDesc};
