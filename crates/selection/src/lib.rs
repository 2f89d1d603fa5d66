pub mod channels;
pub mod state;

pub use channels::*;
pub use state::*;
