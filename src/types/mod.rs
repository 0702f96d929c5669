pub mod event;
pub mod frame;
pub mod header;
pub mod log;

pub use event::*;
pub use frame::*;
pub use header::*;
pub use log::*;
