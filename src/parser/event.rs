//! Event frame decoding
//!
//! E frames carry a one byte event type followed by a payload whose layout
//! depends on the type. Unknown types, and log-end markers without the exact
//! end message, decode to `None` so the caller can treat the frame as a
//! false positive.

use log::{debug, trace};

use crate::parser::stream::{BitReader, ByteSource};
use crate::types::{
    AdjustmentValue, FlightLogEvent, END_OF_LOG_MESSAGE, EVENT_AUTOTUNE_CYCLE_RESULT,
    EVENT_AUTOTUNE_CYCLE_START, EVENT_AUTOTUNE_TARGETS, EVENT_GTUNE_CYCLE_RESULT,
    EVENT_INFLIGHT_ADJUSTMENT, EVENT_LOGGING_RESUME, EVENT_LOG_END, EVENT_SYNC_BEEP,
};

fn read_u8<S: ByteSource>(stream: &mut BitReader<S>) -> u8 {
    stream.read_byte().unwrap_or(0)
}

/// Decode the body of an E frame whose marker was already consumed.
///
/// A genuine log-end event truncates the stream at the current position so
/// nothing after it is parsed.
pub fn decode_event<S: ByteSource>(stream: &mut BitReader<S>) -> Option<FlightLogEvent> {
    let event_type = read_u8(stream);

    let event = match event_type {
        EVENT_SYNC_BEEP => FlightLogEvent::SyncBeep {
            time: stream.read_unsigned_vb(),
        },
        EVENT_AUTOTUNE_CYCLE_START => FlightLogEvent::AutotuneCycleStart {
            phase: read_u8(stream),
            cycle: read_u8(stream),
            p: read_u8(stream),
            i: read_u8(stream),
            d: read_u8(stream),
        },
        EVENT_AUTOTUNE_CYCLE_RESULT => FlightLogEvent::AutotuneCycleResult {
            flags: read_u8(stream),
            p: read_u8(stream),
            i: read_u8(stream),
            d: read_u8(stream),
        },
        EVENT_AUTOTUNE_TARGETS => FlightLogEvent::AutotuneTargets {
            current_angle: stream.read_s16(),
            target_angle: read_u8(stream) as i8,
            target_angle_at_peak: read_u8(stream) as i8,
            first_peak_angle: stream.read_s16(),
            second_peak_angle: stream.read_s16(),
        },
        EVENT_GTUNE_CYCLE_RESULT => FlightLogEvent::GtuneCycleResult {
            axis: read_u8(stream),
            gyro_avg: stream.read_signed_vb(),
            new_p: stream.read_s16(),
        },
        EVENT_INFLIGHT_ADJUSTMENT => {
            let function = read_u8(stream);
            // Functions above 127 carry a float value
            let value = if function > 127 {
                AdjustmentValue::Float(stream.read_raw_float())
            } else {
                AdjustmentValue::Int(stream.read_signed_vb())
            };
            FlightLogEvent::InflightAdjustment { function, value }
        }
        EVENT_LOGGING_RESUME => FlightLogEvent::LoggingResume {
            log_iteration: stream.read_unsigned_vb(),
            current_time: stream.read_unsigned_vb(),
        },
        EVENT_LOG_END => {
            let message = stream.read_raw(END_OF_LOG_MESSAGE.len());
            if message.as_slice() != END_OF_LOG_MESSAGE.as_slice() {
                trace!("Log end event without end message, ignoring");
                return None;
            }
            debug!("End of log at offset {}", stream.position());
            stream.end_stream();
            FlightLogEvent::LogEnd
        }
        other => {
            trace!("Unknown event type {other}");
            return None;
        }
    };

    Some(event)
}
