pub mod events;
pub mod frame;
pub mod metadata;
pub mod stats;

pub use events::*;
pub use frame::*;
pub use metadata::*;
pub use stats::*;
