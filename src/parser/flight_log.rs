//! The log parser state machine
//!
//! [`FlightLogParser`] reads header lines until the first frame marker, then
//! decodes frames one at a time. A frame is only judged once the byte after
//! it is known: it must be followed by another frame marker (or a clean end
//! of stream) and be no longer than [`MAX_FRAME_LENGTH`]. Frames that fail
//! this are corrupt and the search for the next frame restarts one byte past
//! the start of the bad one. Frames that pass go through the completion rules
//! of their type, which may still reject them as out of sync.

use log::{debug, info, trace, warn};

use crate::error::{BBLError, Result};
use crate::listener::{FlightLogListener, FrameReady};
use crate::parser::decoder::PredictionContext;
use crate::parser::event::decode_event;
use crate::parser::frame::{compile_layouts, decode_frame, FrameContext, FrameLayout};
use crate::parser::header::{apply_header_line, read_header_line};
use crate::parser::skipped::{
    count_intentionally_skipped_frames, count_intentionally_skipped_frames_to,
};
use crate::parser::stream::{BitReader, ByteSource};
use crate::types::{
    FieldValues, FlightLogEvent, FrameKind, HistoryRing, LogHeader, LogStatistics, MAX_FIELDS,
    MAX_FRAME_LENGTH,
};

/// Main frames further apart than this in loop iterations are out of sync
const MAXIMUM_ITERATION_JUMP_BETWEEN_FRAMES: u64 = 5000;

/// Main frames further apart than this in microseconds are out of sync
const MAXIMUM_TIME_JUMP_BETWEEN_FRAMES: u64 = 10_000_000;

/// Parse options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Report field values as stored, without predictors, and skip the
    /// iteration/time sanity checks on main frames
    pub raw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Header,
    Data,
    Done,
}

/// Decoder for a single log.
///
/// All state lives here and is dropped with the parser. Multi-log files are
/// split first and parsed with one parser per log.
pub struct FlightLogParser<S> {
    stream: BitReader<S>,
    state: ParserState,
    header: LogHeader,
    layouts: [FrameLayout; 6],
    main_signed: Vec<bool>,
    stats: LogStatistics,

    main_history: HistoryRing,
    main_stream_valid: bool,
    last_main_iteration: Option<u32>,
    last_main_time: Option<u32>,
    last_skipped_frames: u32,

    gps_home_decode: FieldValues,
    gps_home_published: FieldValues,
    gps_home_valid: bool,
    last_gps: FieldValues,
    last_slow: FieldValues,
    last_event: Option<FlightLogEvent>,
}

impl<S: ByteSource> FlightLogParser<S> {
    pub fn new(source: S) -> Self {
        Self {
            stream: BitReader::new(source),
            state: ParserState::Header,
            header: LogHeader::default(),
            layouts: Default::default(),
            main_signed: Vec::new(),
            stats: LogStatistics::default(),
            main_history: HistoryRing::new(),
            main_stream_valid: false,
            last_main_iteration: None,
            last_main_time: None,
            last_skipped_frames: 0,
            gps_home_decode: [0; MAX_FIELDS],
            gps_home_published: [0; MAX_FIELDS],
            gps_home_valid: false,
            last_gps: [0; MAX_FIELDS],
            last_slow: [0; MAX_FIELDS],
            last_event: None,
        }
    }

    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    /// Statistics gathered so far; complete once [`Self::parse`] returns,
    /// whether or not it succeeded
    pub fn stats(&self) -> &LogStatistics {
        &self.stats
    }

    pub fn into_parts(self) -> (LogHeader, LogStatistics) {
        (self.header, self.stats)
    }

    /// Run the parser to the end of the log, reporting to `listener`.
    ///
    /// Fails only when the header cannot describe the data: no frames at all,
    /// no main field definitions, or ids this decoder does not implement.
    pub fn parse<L: FlightLogListener>(
        &mut self,
        listener: &mut L,
        options: ParseOptions,
    ) -> Result<()> {
        if self.state == ParserState::Header {
            let result = self.read_header(listener);
            if result.is_err() {
                self.state = ParserState::Done;
            }
            result?;
        }

        if self.state == ParserState::Data {
            self.read_frames(listener, options);
            self.state = ParserState::Done;

            info!(
                "Parsed {} valid frames, {} corrupt, {} iterations intentionally absent",
                self.stats.total_valid_frames(),
                self.stats.total_corrupt_frames,
                self.stats.intentionally_absent_iterations
            );
        }

        Ok(())
    }

    fn read_header<L: FlightLogListener>(&mut self, listener: &mut L) -> Result<()> {
        loop {
            let position = self.stream.position();
            self.stream.discard_before(position);

            let Some(command) = self.stream.peek_byte() else {
                return Err(BBLError::NoFrames);
            };

            if command == b'H' {
                self.stream.read_byte();
                if let Some((name, value)) = read_header_line(&mut self.stream) {
                    apply_header_line(&mut self.header, &name, &value);
                }
                continue;
            }

            if FrameKind::from_marker(command).is_none() {
                // Garbage ahead of the first frame
                self.stream.read_byte();
                continue;
            }

            if !self.header.frame_def(FrameKind::Intra).is_defined() {
                return Err(BBLError::MissingFieldDefinitions);
            }
            self.start_data(listener)?;
            return Ok(());
        }
    }

    fn start_data<L: FlightLogListener>(&mut self, listener: &mut L) -> Result<()> {
        self.layouts = compile_layouts(&self.header)?;

        let intra = self.header.frame_def(FrameKind::Intra);
        self.main_signed = intra.fields[..intra.count]
            .iter()
            .map(|field| field.signed)
            .collect();

        info!(
            "Header complete: {} main fields, data version {}, I interval {}, P interval {}/{}",
            intra.count,
            self.header.data_version,
            self.header.frame_interval_i,
            self.header.frame_interval_p_num,
            self.header.frame_interval_p_denom
        );

        self.state = ParserState::Data;
        listener.on_metadata_ready(&self.header);
        Ok(())
    }

    fn read_frames<L: FlightLogListener>(&mut self, listener: &mut L, options: ParseOptions) {
        let mut last_frame: Option<(FrameKind, u64)> = None;
        let mut premature_eof = false;

        loop {
            let command = self.stream.peek_byte();

            if let Some((kind, start)) = last_frame {
                let size = (self.stream.position() - start) as usize;
                let looks_complete = match command {
                    Some(byte) => FrameKind::from_marker(byte).is_some(),
                    None => !premature_eof,
                };

                if size <= MAX_FRAME_LENGTH && looks_complete {
                    if self.complete_frame(kind, start, size, options.raw, listener) {
                        self.stats.frame_mut(kind).record_valid(size);
                    } else {
                        self.stats.frame_mut(kind).desync_count += 1;
                    }
                } else {
                    warn!(
                        "Corrupt '{}' frame at offset {start} ({size} bytes), resyncing",
                        kind.marker_char()
                    );
                    self.main_stream_valid = false;
                    self.stats.frame_mut(kind).corrupt_count += 1;
                    self.stats.total_corrupt_frames += 1;

                    listener.on_frame_ready(FrameReady {
                        valid: false,
                        fields: None,
                        kind,
                        field_count: 0,
                        offset: start,
                        size,
                    });

                    // Look for the next frame from the byte after this one began
                    self.stream.seek(start + 1);
                    last_frame = None;
                    premature_eof = false;
                    continue;
                }
            }

            let Some(command) = command else {
                break;
            };

            let start = self.stream.position();
            self.stream.discard_before(start);
            self.stream.read_byte();

            match FrameKind::from_marker(command) {
                Some(kind) => {
                    trace!("Decoding '{}' frame at offset {start}", kind.marker_char());
                    self.decode_frame_body(kind, options.raw);
                    // Running out of data inside a frame means it was truncated
                    if self.stream.is_eof() {
                        premature_eof = true;
                    }
                    last_frame = Some((kind, start));
                }
                None => {
                    self.main_stream_valid = false;
                    last_frame = None;
                }
            }
        }
    }

    fn decode_frame_body(&mut self, kind: FrameKind, raw: bool) {
        let time_index = self.header.time_index();
        let layout = &self.layouts[kind.index()];

        match kind {
            FrameKind::Event => {
                self.last_event = decode_event(&mut self.stream);
            }
            FrameKind::Intra | FrameKind::Inter => {
                let skipped_frames = if kind == FrameKind::Inter {
                    self.last_skipped_frames =
                        count_intentionally_skipped_frames(self.last_main_iteration, &self.header);
                    self.last_skipped_frames
                } else {
                    0
                };

                let (current, previous, previous2) = self.main_history.split();
                let ctx = FrameContext {
                    previous,
                    // Intra frames never look further back than one frame
                    previous2: if kind == FrameKind::Inter {
                        previous2
                    } else {
                        None
                    },
                    skipped_frames,
                    raw,
                    data_version: self.header.data_version,
                    prediction: prediction_context(
                        &self.header,
                        &self.gps_home_published,
                        previous.map(|prev| prev[time_index]),
                    ),
                };
                decode_frame(&mut self.stream, layout, current, &ctx);
            }
            FrameKind::Gps | FrameKind::GpsHome | FrameKind::Slow => {
                let last_main_frame_time = self.main_history.previous().map(|prev| prev[time_index]);
                let ctx = FrameContext {
                    previous: None,
                    previous2: None,
                    skipped_frames: 0,
                    raw,
                    data_version: self.header.data_version,
                    prediction: prediction_context(
                        &self.header,
                        &self.gps_home_published,
                        last_main_frame_time,
                    ),
                };
                let dest = match kind {
                    FrameKind::Gps => &mut self.last_gps,
                    FrameKind::GpsHome => &mut self.gps_home_decode,
                    _ => &mut self.last_slow,
                };
                decode_frame(&mut self.stream, layout, dest, &ctx);
            }
        }
    }

    /// Apply the completion rule of `kind`; `false` means the frame was rejected
    fn complete_frame<L: FlightLogListener>(
        &mut self,
        kind: FrameKind,
        offset: u64,
        size: usize,
        raw: bool,
        listener: &mut L,
    ) -> bool {
        let field_count = self.layouts[kind.index()].count();
        let frame = FrameReady {
            valid: false,
            fields: None,
            kind,
            field_count,
            offset,
            size,
        };

        match kind {
            FrameKind::Intra => {
                let accepted = self.complete_intra_frame(raw);
                let fields = accepted.then(|| &self.main_history.current()[..field_count]);
                listener.on_frame_ready(FrameReady {
                    valid: accepted,
                    fields,
                    ..frame
                });
                if accepted {
                    self.main_history.rotate_intra();
                }
                accepted
            }
            FrameKind::Inter => {
                let valid = self.complete_inter_frame(raw);
                let fields = &self.main_history.current()[..field_count];
                listener.on_frame_ready(FrameReady {
                    valid,
                    fields: Some(fields),
                    ..frame
                });
                if valid {
                    self.main_history.rotate_inter();
                }
                valid
            }
            FrameKind::Event => match self.last_event.take() {
                Some(event) => {
                    if let FlightLogEvent::LoggingResume {
                        log_iteration,
                        current_time,
                    } = event
                    {
                        // Let the next main frame jump ahead to the resume point
                        self.last_main_iteration = Some(log_iteration);
                        self.last_main_time = Some(current_time);
                    }
                    debug!("{} event at offset {offset}", event.name());
                    listener.on_event(&event);
                    true
                }
                None => {
                    debug!("Ignoring unrecognised event frame at offset {offset}");
                    false
                }
            },
            FrameKind::Gps => {
                let fields = &self.last_gps[..field_count];
                listener.on_frame_ready(FrameReady {
                    valid: self.gps_home_valid,
                    fields: Some(fields),
                    ..frame
                });
                true
            }
            FrameKind::GpsHome => {
                self.gps_home_published = self.gps_home_decode;
                self.gps_home_valid = true;
                let fields = &self.gps_home_published[..field_count];
                listener.on_frame_ready(FrameReady {
                    valid: true,
                    fields: Some(fields),
                    ..frame
                });
                true
            }
            FrameKind::Slow => {
                let fields = &self.last_slow[..field_count];
                listener.on_frame_ready(FrameReady {
                    valid: true,
                    fields: Some(fields),
                    ..frame
                });
                true
            }
        }
    }

    /// Check a freshly decoded intra frame against the last main frame and
    /// record it if it fits. Rejection drops the main history.
    fn complete_intra_frame(&mut self, raw: bool) -> bool {
        let (iteration, time) = self.current_iteration_and_time();

        let accepted = raw
            || match (self.last_main_iteration, self.last_main_time) {
                (Some(last_iteration), last_time) => {
                    let last_iteration = last_iteration as u64;
                    let last_time = last_time.unwrap_or(0) as u64;
                    (iteration as u64) >= last_iteration
                        && (iteration as u64) < last_iteration + MAXIMUM_ITERATION_JUMP_BETWEEN_FRAMES
                        && (time as u64) >= last_time
                        && (time as u64) < last_time + MAXIMUM_TIME_JUMP_BETWEEN_FRAMES
                }
                (None, _) => true,
            };

        if accepted {
            self.stats.intentionally_absent_iterations += count_intentionally_skipped_frames_to(
                self.last_main_iteration,
                iteration,
                &self.header,
            );
            self.last_main_iteration = Some(iteration);
            self.last_main_time = Some(time);
            self.main_stream_valid = true;

            let count = self.main_signed.len();
            self.stats
                .update_field_stats(&self.main_history.current()[..count], &self.main_signed);
        } else {
            debug!(
                "Rejecting intra frame: iteration {iteration}, time {time} after iteration {:?}, time {:?}",
                self.last_main_iteration, self.last_main_time
            );
            self.main_stream_valid = false;
            self.main_history.invalidate();
        }

        accepted
    }

    /// Inter frames cannot resynchronise the main stream, only lose it
    fn complete_inter_frame(&mut self, raw: bool) -> bool {
        let (iteration, time) = self.current_iteration_and_time();

        if self.main_stream_valid && !raw {
            let last_iteration = self.last_main_iteration.unwrap_or(0) as u64;
            let last_time = self.last_main_time.unwrap_or(0) as u64;
            if (time as u64) > last_time + MAXIMUM_TIME_JUMP_BETWEEN_FRAMES
                || (iteration as u64) > last_iteration + MAXIMUM_ITERATION_JUMP_BETWEEN_FRAMES
            {
                debug!("Inter frame jumped to iteration {iteration}, time {time}; main stream lost");
                self.main_stream_valid = false;
            }
        }

        if self.main_stream_valid {
            self.last_main_iteration = Some(iteration);
            self.last_main_time = Some(time);
            self.stats.intentionally_absent_iterations += self.last_skipped_frames;

            let count = self.main_signed.len();
            self.stats
                .update_field_stats(&self.main_history.current()[..count], &self.main_signed);
        }

        self.main_stream_valid
    }

    fn current_iteration_and_time(&self) -> (u32, u32) {
        let current = self.main_history.current();
        (
            current[self.header.iteration_index()] as u32,
            current[self.header.time_index()] as u32,
        )
    }
}

fn prediction_context<'a>(
    header: &'a LogHeader,
    home: &'a FieldValues,
    last_main_frame_time: Option<i32>,
) -> PredictionContext<'a> {
    PredictionContext {
        sysconfig: &header.sysconfig,
        motor0_index: header.main_indexes.motor[0],
        home,
        home_indexes: header.gps_home_indexes.home,
        last_main_frame_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::FrameCollector;
    use crate::parser::stream::SliceSource;
    use crate::types::FrameKind;

    const MAIN_SCHEMA: &str = "H Field I name:loopIteration,time\n\
                               H Field I signed:0,0\n\
                               H Field I predictor:0,0\n\
                               H Field I encoding:1,1\n\
                               H Field P predictor:6,1\n\
                               H Field P encoding:9,0\n";

    fn uvb(mut value: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        while value >= 0x80 {
            bytes.push((value as u8) | 0x80);
            value >>= 7;
        }
        bytes.push(value as u8);
        bytes
    }

    fn svb(value: i32) -> Vec<u8> {
        uvb(((value << 1) ^ (value >> 31)) as u32)
    }

    fn intra(iteration: u32, time: u32) -> Vec<u8> {
        let mut frame = vec![b'I'];
        frame.extend(uvb(iteration));
        frame.extend(uvb(time));
        frame
    }

    fn inter(time_delta: i32) -> Vec<u8> {
        let mut frame = vec![b'P'];
        frame.extend(svb(time_delta));
        frame
    }

    fn run(data: &[u8], options: ParseOptions) -> (Result<()>, FrameCollector, LogStatistics) {
        let mut collector = FrameCollector::new();
        let mut parser = FlightLogParser::new(SliceSource::new(data));
        let result = parser.parse(&mut collector, options);
        let (_, stats) = parser.into_parts();
        (result, collector, stats)
    }

    fn log_with(schema: &str, frames: &[Vec<u8>]) -> Vec<u8> {
        let mut data = schema.as_bytes().to_vec();
        for frame in frames {
            data.extend_from_slice(frame);
        }
        data
    }

    #[test]
    fn test_minimal_log() {
        let data = log_with(MAIN_SCHEMA, &[intra(0, 1000)]);
        let (result, collector, stats) = run(&data, ParseOptions::default());

        assert!(result.is_ok());
        assert_eq!(collector.metadata_ready_count, 1);
        assert_eq!(collector.frames.len(), 1);

        let frame = &collector.frames[0];
        assert_eq!(frame.kind, FrameKind::Intra);
        assert!(frame.valid);
        assert_eq!(frame.values, vec![0, 1000]);
        assert_eq!(frame.offset, MAIN_SCHEMA.len() as u64);
        assert_eq!(frame.size, 4);

        let intra_stats = stats.frame(FrameKind::Intra);
        assert_eq!(intra_stats.valid_count, 1);
        assert_eq!(intra_stats.bytes, 4);
        assert_eq!(intra_stats.size_count[4], 1);
        assert_eq!(stats.total_corrupt_frames, 0);
        assert_eq!(stats.field[1], crate::types::FieldStatistics { min: 1000, max: 1000 });
    }

    #[test]
    fn test_inter_frame_increment_and_previous() {
        let data = log_with(MAIN_SCHEMA, &[intra(0, 1000), inter(500), inter(250)]);
        let (result, collector, stats) = run(&data, ParseOptions::default());

        assert!(result.is_ok());
        let values: Vec<_> = collector.frames.iter().map(|f| f.values.clone()).collect();
        assert_eq!(values, vec![vec![0, 1000], vec![1, 1500], vec![2, 1750]]);
        assert!(collector.frames.iter().all(|f| f.valid));
        assert_eq!(stats.frame(FrameKind::Inter).valid_count, 2);
        assert_eq!(stats.field[1], crate::types::FieldStatistics { min: 1000, max: 1750 });
    }

    #[test]
    fn test_inter_frame_counts_skipped_iterations() {
        let schema = format!("H P interval:1/2\n{MAIN_SCHEMA}");
        let data = log_with(&schema, &[intra(0, 1000), inter(500)]);
        let (_, collector, stats) = run(&data, ParseOptions::default());

        // Iteration 1 is not logged at half rate, so the P frame is iteration 2
        assert_eq!(collector.frames[1].values, vec![2, 1500]);
        assert_eq!(stats.intentionally_absent_iterations, 1);
    }

    #[test]
    fn test_header_without_frames() {
        let (result, collector, _) = run(MAIN_SCHEMA.as_bytes(), ParseOptions::default());
        assert!(matches!(result, Err(BBLError::NoFrames)));
        assert_eq!(collector.metadata_ready_count, 0);
    }

    #[test]
    fn test_missing_main_definitions() {
        let (result, _, _) = run(b"H Data version:2\nI\x00\x00", ParseOptions::default());
        assert!(matches!(result, Err(BBLError::MissingFieldDefinitions)));
    }

    #[test]
    fn test_unknown_encoding_is_fatal() {
        let schema = MAIN_SCHEMA.replace("encoding:1,1", "encoding:1,2");
        let data = log_with(&schema, &[intra(0, 1000)]);
        let (result, collector, _) = run(&data, ParseOptions::default());

        let err = result.expect_err("encoding 2 is not defined");
        assert!(err.is_configuration_error());
        assert!(matches!(
            err,
            BBLError::UnsupportedEncoding {
                frame: 'I',
                field: 1,
                id: 2
            }
        ));
        assert!(collector.frames.is_empty());
    }

    #[test]
    fn test_garbage_before_first_frame_is_skipped() {
        let mut data = b"\x00\x01garbage-".to_vec();
        data.extend(log_with(MAIN_SCHEMA, &[intra(0, 1000)]));
        let (result, collector, _) = run(&data, ParseOptions::default());

        assert!(result.is_ok());
        assert_eq!(collector.frames.len(), 1);
        assert!(collector.frames[0].valid);
    }

    #[test]
    fn test_backwards_intra_frame_rejected() {
        let data = log_with(
            MAIN_SCHEMA,
            &[intra(10, 1000), intra(5, 2000), inter(100), intra(20, 3000)],
        );
        let (_, collector, stats) = run(&data, ParseOptions::default());

        let frames = &collector.frames;
        assert_eq!(frames.len(), 4);
        assert!(frames[0].valid);

        // Rejected intra frame carries no values and is not counted as corrupt
        assert!(!frames[1].valid);
        assert!(frames[1].values.is_empty());
        assert_eq!(stats.frame(FrameKind::Intra).desync_count, 1);
        assert_eq!(stats.total_corrupt_frames, 0);

        // The following P frame has no valid stream to build on
        assert_eq!(frames[2].kind, FrameKind::Inter);
        assert!(!frames[2].valid);
        assert_eq!(stats.frame(FrameKind::Inter).desync_count, 1);

        assert!(frames[3].valid);
        assert_eq!(frames[3].values, vec![20, 3000]);
    }

    #[test]
    fn test_raw_mode_skips_validation_and_prediction() {
        let data = log_with(MAIN_SCHEMA, &[intra(10, 1000), intra(5, 2000), inter(100)]);
        let (_, collector, _) = run(&data, ParseOptions { raw: true });

        assert!(collector.frames.iter().all(|f| f.valid));
        assert_eq!(collector.frames[1].values, vec![5, 2000]);
        // Increment still applies; the time delta is reported as stored
        assert_eq!(collector.frames[2].values, vec![6, 100]);
    }

    #[test]
    fn test_logging_resume_allows_jump() {
        let mut resume = vec![b'E', 14];
        resume.extend(uvb(9000));
        resume.extend(uvb(30_000_000));

        let data = log_with(MAIN_SCHEMA, &[intra(0, 1000), resume, intra(9000, 30_000_100)]);
        let (_, collector, stats) = run(&data, ParseOptions::default());

        assert_eq!(
            collector.events,
            vec![FlightLogEvent::LoggingResume {
                log_iteration: 9000,
                current_time: 30_000_000,
            }]
        );
        assert_eq!(collector.frames.len(), 2);
        assert!(collector.frames[1].valid);
        assert_eq!(stats.frame(FrameKind::Event).valid_count, 1);
    }

    #[test]
    fn test_unknown_event_is_desync_not_corrupt() {
        let data = log_with(MAIN_SCHEMA, &[intra(0, 1000), vec![b'E', 99], intra(1, 1100)]);
        let (_, collector, stats) = run(&data, ParseOptions::default());

        assert!(collector.events.is_empty());
        assert_eq!(stats.frame(FrameKind::Event).desync_count, 1);
        assert_eq!(stats.total_corrupt_frames, 0);
        assert_eq!(collector.frames.len(), 2);
        assert!(collector.frames[1].valid);
    }

    #[test]
    fn test_unknown_byte_between_frames_corrupts_previous() {
        let mut data = log_with(MAIN_SCHEMA, &[intra(0, 1000)]);
        data.push(b'x');
        data.extend(intra(1, 1100));
        let (_, collector, stats) = run(&data, ParseOptions::default());

        assert_eq!(stats.total_corrupt_frames, 1);
        assert!(collector.frames[0].is_corrupt());
        let last = collector.frames.last().expect("frames delivered");
        assert!(last.valid);
        assert_eq!(last.values, vec![1, 1100]);
    }

    #[test]
    fn test_truncated_frame_is_corrupt() {
        let mut data = log_with(MAIN_SCHEMA, &[intra(0, 1000)]);
        // Continuation bit set on the last byte available
        data.extend_from_slice(&[b'I', 0x01, 0x80]);
        let (result, collector, stats) = run(&data, ParseOptions::default());

        assert!(result.is_ok());
        assert!(collector.frames[0].valid);
        assert!(stats.total_corrupt_frames >= 1);
        assert!(collector.frames[1].is_corrupt());
        assert_eq!(collector.frames[1].offset, data.len() as u64 - 3);
    }

    #[test]
    fn test_gps_home_prediction() {
        let schema = format!(
            "{MAIN_SCHEMA}\
             H Field H name:GPS_home[0],GPS_home[1]\n\
             H Field H signed:1,1\n\
             H Field H predictor:0,0\n\
             H Field H encoding:0,0\n\
             H Field G name:time,GPS_coord[0],GPS_coord[1]\n\
             H Field G signed:0,1,1\n\
             H Field G predictor:10,7,7\n\
             H Field G encoding:1,0,0\n"
        );

        let gps = |delta_time: u32, lat: i32, lon: i32| {
            let mut frame = vec![b'G'];
            frame.extend(uvb(delta_time));
            frame.extend(svb(lat));
            frame.extend(svb(lon));
            frame
        };
        let mut home = vec![b'H'];
        home.extend(svb(100));
        home.extend(svb(-200));

        let data = log_with(
            &schema,
            &[intra(0, 1000), gps(5, 1, 2), home, gps(7, 1, 2)],
        );
        let (result, collector, _) = run(&data, ParseOptions::default());
        assert!(result.is_ok());

        let frames: Vec<_> = collector
            .frames
            .iter()
            .map(|f| (f.kind, f.valid, f.values.clone()))
            .collect();
        assert_eq!(
            frames,
            vec![
                (FrameKind::Intra, true, vec![0, 1000]),
                // No home yet: reported as not valid
                (FrameKind::Gps, false, vec![1005, 1, 2]),
                (FrameKind::GpsHome, true, vec![100, -200]),
                (FrameKind::Gps, true, vec![1007, 101, -198]),
            ]
        );
    }

    #[test]
    fn test_undefined_home_reference_is_fatal() {
        let schema = format!(
            "{MAIN_SCHEMA}\
             H Field G name:GPS_coord[0]\n\
             H Field G predictor:7\n\
             H Field G encoding:0\n"
        );
        let data = log_with(&schema, &[intra(0, 1000)]);
        let (result, _, _) = run(&data, ParseOptions::default());
        assert!(matches!(
            result,
            Err(BBLError::UndefinedFieldReference {
                frame: 'G',
                reference: "GPS_home[0]",
                ..
            })
        ));
    }

    #[test]
    fn test_slow_frame_delivered() {
        let schema = format!(
            "{MAIN_SCHEMA}\
             H Field S name:flightModeFlags,stateFlags,failsafePhase\n\
             H Field S signed:0,0,0\n\
             H Field S predictor:0,0,0\n\
             H Field S encoding:1,1,1\n"
        );
        let data = log_with(&schema, &[intra(0, 1000), vec![b'S', 3, 1, 0]]);
        let (_, collector, stats) = run(&data, ParseOptions::default());

        assert_eq!(collector.frames[1].kind, FrameKind::Slow);
        assert_eq!(collector.frames[1].values, vec![3, 1, 0]);
        assert_eq!(stats.frame(FrameKind::Slow).valid_count, 1);
    }

    #[test]
    fn test_parse_is_single_shot() {
        let data = log_with(MAIN_SCHEMA, &[intra(0, 1000)]);
        let mut collector = FrameCollector::new();
        let mut parser = FlightLogParser::new(SliceSource::new(&data));

        assert!(parser.parse(&mut collector, ParseOptions::default()).is_ok());
        assert!(parser.parse(&mut collector, ParseOptions::default()).is_ok());
        assert_eq!(collector.frames.len(), 1);
        assert_eq!(parser.stats().frame(FrameKind::Intra).valid_count, 1);
        assert_eq!(parser.header().frame_def(FrameKind::Intra).count, 2);
    }
}
