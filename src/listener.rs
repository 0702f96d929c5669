//! Callbacks the parser drives while decoding
//!
//! A [`FlightLogListener`] receives the header once it is complete, every
//! frame attempt (including corrupt ones) and every accepted event. Slices
//! handed to [`FlightLogListener::on_frame_ready`] point into buffers the
//! parser reuses, so listeners that keep data must copy it.

use crate::types::{DecodedFrame, FlightLogEvent, FrameKind, LogHeader};

/// One frame attempt as seen by a listener
#[derive(Debug, Clone, Copy)]
pub struct FrameReady<'a> {
    pub valid: bool,
    /// `None` for corrupt frames and rejected intra frames
    pub fields: Option<&'a [i32]>,
    pub kind: FrameKind,
    pub field_count: usize,
    /// Offset of the frame's marker byte within the log
    pub offset: u64,
    pub size: usize,
}

impl FrameReady<'_> {
    pub fn to_decoded(&self) -> DecodedFrame {
        DecodedFrame {
            kind: self.kind,
            valid: self.valid,
            values: self.fields.map(<[i32]>::to_vec).unwrap_or_default(),
            offset: self.offset,
            size: self.size,
        }
    }
}

pub trait FlightLogListener {
    /// Called once, when the header has been read and frames are about to start
    fn on_metadata_ready(&mut self, _header: &LogHeader) {}

    fn on_frame_ready(&mut self, _frame: FrameReady<'_>) {}

    fn on_event(&mut self, _event: &FlightLogEvent) {}
}

impl<L: FlightLogListener + ?Sized> FlightLogListener for &mut L {
    fn on_metadata_ready(&mut self, header: &LogHeader) {
        (**self).on_metadata_ready(header);
    }

    fn on_frame_ready(&mut self, frame: FrameReady<'_>) {
        (**self).on_frame_ready(frame);
    }

    fn on_event(&mut self, event: &FlightLogEvent) {
        (**self).on_event(event);
    }
}

/// Listener that ignores everything, for parses run only for statistics
impl FlightLogListener for () {}

/// Listener that keeps owned copies of everything it is given
#[derive(Debug, Clone, Default)]
pub struct FrameCollector {
    pub header: Option<LogHeader>,
    pub frames: Vec<DecodedFrame>,
    pub events: Vec<FlightLogEvent>,
    pub metadata_ready_count: usize,
}

impl FrameCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn corrupt_frames(&self) -> usize {
        self.frames.iter().filter(|frame| frame.is_corrupt()).count()
    }
}

impl FlightLogListener for FrameCollector {
    fn on_metadata_ready(&mut self, header: &LogHeader) {
        self.metadata_ready_count += 1;
        self.header = Some(header.clone());
    }

    fn on_frame_ready(&mut self, frame: FrameReady<'_>) {
        self.frames.push(frame.to_decoded());
    }

    fn on_event(&mut self, event: &FlightLogEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_copies_frames() {
        let mut collector = FrameCollector::new();
        let values = [7, 8, 9];

        collector.on_frame_ready(FrameReady {
            valid: true,
            fields: Some(&values[..2]),
            kind: FrameKind::Intra,
            field_count: 2,
            offset: 10,
            size: 3,
        });
        collector.on_frame_ready(FrameReady {
            valid: false,
            fields: None,
            kind: FrameKind::Inter,
            field_count: 0,
            offset: 13,
            size: 1,
        });

        assert_eq!(collector.frames.len(), 2);
        assert_eq!(collector.frames[0].values, vec![7, 8]);
        assert!(!collector.frames[0].is_corrupt());
        assert!(collector.frames[1].is_corrupt());
        assert_eq!(collector.corrupt_frames(), 1);
    }

    #[test]
    fn test_forwarding_through_mut_ref() {
        fn drive<L: FlightLogListener>(mut listener: L) {
            listener.on_metadata_ready(&LogHeader::default());
            listener.on_event(&FlightLogEvent::SyncBeep { time: 5 });
        }

        let mut collector = FrameCollector::new();
        drive(&mut collector);
        assert_eq!(collector.metadata_ready_count, 1);
        assert!(collector.header.is_some());
        assert_eq!(collector.events, vec![FlightLogEvent::SyncBeep { time: 5 }]);
    }
}
