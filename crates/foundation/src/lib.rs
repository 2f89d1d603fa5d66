pub mod bounds;
pub mod geo;
pub mod hit;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use geo::*;
