pub mod cell;
pub mod dedupe;
pub mod indexer;

pub use cell::*;
pub use dedupe::*;
pub use indexer::*;
