pub mod codec;
pub mod decoder;
pub mod event;
pub mod flight_log;
pub mod frame;
pub mod header;
pub mod helpers;
pub mod main;
pub mod skipped;
pub mod stream;

pub use codec::*;
pub use decoder::*;
pub use event::*;
pub use flight_log::*;
pub use frame::*;
pub use header::*;
pub use helpers::*;
pub use main::*;
pub use skipped::*;
pub use stream::*;
