pub mod enums;
pub mod signal;

// Re-export the core types to provide a clean public API.
pub use enums::OrderSide;
pub use signal::{Direction, EntrySignal, ExitMode, ExitSignal, Signal};
