#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const EVENT_SYNC_BEEP: u8 = 0;
pub const EVENT_AUTOTUNE_CYCLE_START: u8 = 10;
pub const EVENT_AUTOTUNE_CYCLE_RESULT: u8 = 11;
pub const EVENT_AUTOTUNE_TARGETS: u8 = 12;
pub const EVENT_INFLIGHT_ADJUSTMENT: u8 = 13;
pub const EVENT_LOGGING_RESUME: u8 = 14;
pub const EVENT_GTUNE_CYCLE_RESULT: u8 = 20;
pub const EVENT_LOG_END: u8 = 255;

/// Payload written after a log-end event
pub const END_OF_LOG_MESSAGE: &[u8; 11] = b"End of log\0";

/// New value carried by an in-flight adjustment event
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AdjustmentValue {
    Int(i32),
    Float(f32),
}

/// A decoded event frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FlightLogEvent {
    SyncBeep {
        time: u32,
    },
    AutotuneCycleStart {
        phase: u8,
        cycle: u8,
        p: u8,
        i: u8,
        d: u8,
    },
    AutotuneCycleResult {
        flags: u8,
        p: u8,
        i: u8,
        d: u8,
    },
    AutotuneTargets {
        current_angle: i16,
        target_angle: i8,
        target_angle_at_peak: i8,
        first_peak_angle: i16,
        second_peak_angle: i16,
    },
    GtuneCycleResult {
        axis: u8,
        gyro_avg: i32,
        new_p: i16,
    },
    InflightAdjustment {
        function: u8,
        value: AdjustmentValue,
    },
    LoggingResume {
        log_iteration: u32,
        current_time: u32,
    },
    LogEnd,
}

impl FlightLogEvent {
    /// The event type id as written in the log
    pub fn event_type(&self) -> u8 {
        match self {
            FlightLogEvent::SyncBeep { .. } => EVENT_SYNC_BEEP,
            FlightLogEvent::AutotuneCycleStart { .. } => EVENT_AUTOTUNE_CYCLE_START,
            FlightLogEvent::AutotuneCycleResult { .. } => EVENT_AUTOTUNE_CYCLE_RESULT,
            FlightLogEvent::AutotuneTargets { .. } => EVENT_AUTOTUNE_TARGETS,
            FlightLogEvent::GtuneCycleResult { .. } => EVENT_GTUNE_CYCLE_RESULT,
            FlightLogEvent::InflightAdjustment { .. } => EVENT_INFLIGHT_ADJUSTMENT,
            FlightLogEvent::LoggingResume { .. } => EVENT_LOGGING_RESUME,
            FlightLogEvent::LogEnd => EVENT_LOG_END,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlightLogEvent::SyncBeep { .. } => "Sync beep",
            FlightLogEvent::AutotuneCycleStart { .. } => "Autotune cycle start",
            FlightLogEvent::AutotuneCycleResult { .. } => "Autotune cycle result",
            FlightLogEvent::AutotuneTargets { .. } => "Autotune targets",
            FlightLogEvent::GtuneCycleResult { .. } => "G-Tune cycle result",
            FlightLogEvent::InflightAdjustment { .. } => "Inflight adjustment",
            FlightLogEvent::LoggingResume { .. } => "Logging resume",
            FlightLogEvent::LogEnd => "Log end",
        }
    }
}
