pub mod feature_layer;

pub use feature_layer::*;
