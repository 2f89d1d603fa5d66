pub mod feature_collection;

pub use feature_collection::*;
