pub mod catalog;
pub mod layer;
pub mod picking;
pub mod query;
pub mod raster;
pub mod spec;
pub mod stack;
pub mod symbology;
pub mod vector;

pub use catalog::ResourceCatalog;
pub use layer::*;
pub use picking::*;
pub use query::{PropertyFilter, PropertyOp};
pub use raster::TileLayer;
pub use spec::{LayerKind, LayerSpec, resolve};
pub use stack::{AssemblyToken, LayerStack, LayerStackAssembler};
pub use symbology::{LayerStyle, StyleVariant};
pub use vector::{LayerBuilder, LayerContent, LayerFeatures, LayerStatus, VectorLayer};
