pub mod cache;
pub mod residency;
pub mod source;

pub use cache::*;
pub use residency::*;
pub use source::*;
