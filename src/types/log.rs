use crate::types::{DecodedFrame, FlightLogEvent, FrameKind, LogHeader, MAX_FRAME_LENGTH};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per frame-type counters
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameStatistics {
    /// Bytes consumed by accepted frames of this type
    pub bytes: u64,
    pub valid_count: u32,
    /// Frames that decoded cleanly but were rejected by validation
    pub desync_count: u32,
    /// Frames that were oversized or not followed by a frame boundary
    pub corrupt_count: u32,
    /// Histogram of accepted frame sizes, indexed by size in bytes (0..=256)
    pub size_count: Vec<u32>,
}

impl FrameStatistics {
    pub fn new() -> Self {
        Self {
            bytes: 0,
            valid_count: 0,
            desync_count: 0,
            corrupt_count: 0,
            size_count: vec![0; MAX_FRAME_LENGTH + 1],
        }
    }

    pub(crate) fn record_valid(&mut self, size: usize) {
        self.bytes += size as u64;
        self.valid_count += 1;
        if let Some(bucket) = self.size_count.get_mut(size) {
            *bucket += 1;
        }
    }

    pub fn total_count(&self) -> u32 {
        self.valid_count + self.desync_count + self.corrupt_count
    }
}

impl Default for FrameStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Running range of one main-frame field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldStatistics {
    pub min: i64,
    pub max: i64,
}

/// Quality figures for one parsed log
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LogStatistics {
    pub total_corrupt_frames: u32,
    /// Main-frame iterations the sampling rate deliberately left out
    pub intentionally_absent_iterations: u32,
    /// Min/max per main-frame field, empty until the first accepted main frame
    pub field: Vec<FieldStatistics>,
    pub frame: [FrameStatistics; 6],
}

impl LogStatistics {
    pub fn frame(&self, kind: FrameKind) -> &FrameStatistics {
        &self.frame[kind.index()]
    }

    pub fn frame_mut(&mut self, kind: FrameKind) -> &mut FrameStatistics {
        &mut self.frame[kind.index()]
    }

    pub fn have_field_stats(&self) -> bool {
        !self.field.is_empty()
    }

    /// Widen each field the way its signedness dictates and fold it into the ranges
    pub(crate) fn update_field_stats(&mut self, values: &[i32], signed: &[bool]) {
        let widen = |value: i32, signed: bool| {
            if signed {
                value as i64
            } else {
                value as u32 as i64
            }
        };

        if self.field.is_empty() {
            self.field = values
                .iter()
                .zip(signed)
                .map(|(&value, &signed)| {
                    let value = widen(value, signed);
                    FieldStatistics {
                        min: value,
                        max: value,
                    }
                })
                .collect();
            return;
        }

        for ((stats, &value), &signed) in self.field.iter_mut().zip(values).zip(signed) {
            let value = widen(value, signed);
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
        }
    }

    /// Valid frames of every type
    pub fn total_valid_frames(&self) -> u32 {
        self.frame.iter().map(|f| f.valid_count).sum()
    }
}

/// How the parse of one log ended
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParseOutcome {
    #[default]
    Completed,
    /// The log could not be decoded past this point
    Failed {
        message: String,
        configuration_error: bool,
    },
}

impl ParseOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ParseOutcome::Completed)
    }
}

/// Complete BBL log data
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BBLLog {
    pub log_number: usize,
    pub total_logs: usize,
    pub header: LogHeader,
    pub stats: LogStatistics,
    pub frames: Vec<DecodedFrame>,
    pub events: Vec<FlightLogEvent>,
    pub outcome: ParseOutcome,
}

impl BBLLog {
    pub fn new(log_number: usize, total_logs: usize) -> Self {
        Self {
            log_number,
            total_logs,
            header: LogHeader::default(),
            stats: LogStatistics::default(),
            frames: Vec::new(),
            events: Vec::new(),
            outcome: ParseOutcome::Completed,
        }
    }

    /// Get frames of a specific type
    pub fn frames_by_kind(&self, kind: FrameKind) -> impl Iterator<Item = &DecodedFrame> {
        self.frames.iter().filter(move |frame| frame.kind == kind)
    }

    /// Valid main frames in log order
    pub fn main_frames(&self) -> impl Iterator<Item = &DecodedFrame> {
        self.frames
            .iter()
            .filter(|frame| frame.kind.is_main() && frame.valid)
    }

    /// Get the duration of the log in microseconds
    pub fn duration_us(&self) -> u64 {
        let time_index = self.header.time_index();
        let mut times = self
            .main_frames()
            .filter_map(|frame| frame.value(time_index))
            .map(|time| time as u32 as u64);

        match times.next() {
            Some(first) => times.last().unwrap_or(first).saturating_sub(first),
            None => 0,
        }
    }

    /// Get the duration of the log in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.duration_us() as f64 / 1_000_000.0
    }

    /// Check if this log contains GPS data
    pub fn has_gps_data(&self) -> bool {
        self.stats.frame(FrameKind::Gps).valid_count > 0
    }

    /// Check if this log contains slow frames
    pub fn has_slow_data(&self) -> bool {
        self.stats.frame(FrameKind::Slow).valid_count > 0
    }
}
