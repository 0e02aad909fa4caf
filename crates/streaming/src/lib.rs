pub mod config;
pub mod controller;
pub mod coordinator;
pub mod events;
pub mod query;
pub mod source;

#[cfg(test)]
pub(crate) mod test_util;

pub use config::*;
pub use controller::*;
pub use coordinator::*;
pub use events::*;
pub use query::*;
pub use source::*;
