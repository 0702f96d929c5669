//! Blackbox Log Decoder
//!
//! A Rust library for decoding Cleanflight/Baseflight blackbox flight data
//! recorder logs. Logs are self-describing: a text header declares, per frame
//! type, the fields, their predictors and their encodings, followed by a
//! binary stream of intra (`I`), inter (`P`), GPS (`G`), GPS home (`H`),
//! slow (`S`) and event (`E`) frames.
//!
//! # Features
//!
//! - **`serde`**: Enable serialization/deserialization of the decoded types
//!
//! # Quick Start
//!
//! Parse a log file and access frame data:
//! ```rust,no_run
//! use blackbox_decode::{parse_bbl_file, FrameKind, ParseOptions};
//! use std::path::Path;
//!
//! let log = parse_bbl_file(Path::new("flight.TXT"), ParseOptions::default()).unwrap();
//! println!("Decoded {} frames", log.frames.len());
//! println!("Corrupt frames: {}", log.stats.total_corrupt_frames);
//! println!("Valid I frames: {}", log.stats.frame(FrameKind::Intra).valid_count);
//! ```
//!
//! Stream frames to your own listener without keeping them:
//! ```rust,no_run
//! use blackbox_decode::{parse_bbl_reader, FlightLogListener, FrameReady, ParseOptions};
//! use std::fs::File;
//!
//! struct MotorPeak(i32);
//!
//! impl FlightLogListener for MotorPeak {
//!     fn on_frame_ready(&mut self, frame: FrameReady<'_>) {
//!         if let (true, Some(fields)) = (frame.valid, frame.fields) {
//!             self.0 = self.0.max(fields.iter().copied().max().unwrap_or(0));
//!         }
//!     }
//! }
//!
//! let mut peak = MotorPeak(0);
//! let file = File::open("flight.TXT").unwrap();
//! parse_bbl_reader(file, &mut peak, ParseOptions::default()).unwrap();
//! ```
//!
//! # Public API
//!
//! ## Parsing Functions
//! - [`parse_bbl_file`] - Parse a file and return the first log
//! - [`parse_bbl_file_all_logs`] - Parse a file and return all logs
//! - [`parse_bbl_bytes`] - Parse data from memory
//! - [`parse_bbl_bytes_all_logs`] - Parse multiple logs from memory
//! - [`parse_bbl_reader`] - Stream one log from any reader to a listener
//! - [`FlightLogParser`] - Low-level API over any [`ByteSource`]
//!
//! ## Data Types
//! - [`BBLLog`] - Complete parsed log with all frames and statistics
//! - [`LogHeader`] - Field definitions and calibration values
//! - [`DecodedFrame`] - Individual frame with decoded values
//! - [`FlightLogEvent`] - Decoded event frame
//! - [`LogStatistics`] - Frame counts and field ranges
//!
//! ## Conversion Utilities
//! - [`SysConfig::vbat_adc_to_millivolts`] - Battery voltage from ADC reading
//! - [`SysConfig::amperage_adc_to_milliamps`] - Current from ADC reading
//! - [`format_flight_mode_flags`] - Format flight mode as human-readable text
//! - [`format_state_flags`] - Format state flags as human-readable text
//! - [`format_failsafe_phase`] - Format failsafe phase as text

pub mod conversion;
pub mod error;
pub mod listener;
pub mod parser;
pub mod types;

// Re-export everything from modules for convenience
#[allow(ambiguous_glob_reexports)]
pub use conversion::*;
pub use error::BBLError;
#[allow(ambiguous_glob_reexports)]
pub use listener::*;
#[allow(ambiguous_glob_reexports)]
pub use parser::*;
#[allow(ambiguous_glob_reexports)]
pub use types::*;

// Re-export Result type for convenience
pub use anyhow::Result;
