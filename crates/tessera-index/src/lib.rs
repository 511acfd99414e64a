#![forbid(unsafe_code)]

mod index;
mod map;
mod table;

use smallvec::SmallVec;

pub use index::{TupleIndex, TupleIter};
pub use map::TupleMap;
pub use table::TupleTable;
pub use tessera_types::NodeId;

/// Owned tuple in canonical field order. Inline up to quad arity.
pub type Tuple = SmallVec<[NodeId; 4]>;
