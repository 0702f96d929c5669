use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use crate::error::BBLError;
use crate::listener::{FlightLogListener, FrameCollector};
use crate::parser::flight_log::{FlightLogParser, ParseOptions};
use crate::parser::stream::{ByteSource, ReadSource, SliceSource};
use crate::types::{BBLLog, LogHeader, LogStatistics, ParseOutcome};

/// First line of every log; a file holds one log per occurrence
pub const LOG_START_MARKER: &[u8] = b"H Product:Blackbox flight data recorder by Nicholas Sherlock\n";

/// Logs after this many in one file are ignored
pub const MAX_LOGS_IN_FILE: usize = 31;

/// Offsets of every log start marker in `data`, at most [`MAX_LOGS_IN_FILE`]
pub fn find_log_starts(data: &[u8]) -> Vec<usize> {
    let mut starts: Vec<usize> = data
        .windows(LOG_START_MARKER.len())
        .enumerate()
        .filter(|(_, window)| *window == LOG_START_MARKER)
        .map(|(offset, _)| offset)
        .collect();

    if starts.len() > MAX_LOGS_IN_FILE {
        warn!(
            "Found {} logs, only the first {MAX_LOGS_IN_FILE} will be parsed",
            starts.len()
        );
        starts.truncate(MAX_LOGS_IN_FILE);
    }
    starts
}

/// Parse one log from any byte source, streaming every frame to `listener`.
///
/// Returns the header and statistics on success. On failure the error is
/// returned and whatever statistics were gathered are lost; use
/// [`FlightLogParser`] directly to keep them.
pub fn parse_log_stream<S: ByteSource, L: FlightLogListener>(
    source: S,
    listener: &mut L,
    options: ParseOptions,
) -> crate::error::Result<(LogHeader, LogStatistics)> {
    let mut parser = FlightLogParser::new(source);
    parser.parse(listener, options)?;
    Ok(parser.into_parts())
}

/// Parse a single log from a reader without buffering the whole input.
///
/// A read error fails the parse with [`BBLError::Io`], even though the
/// listener has already seen every frame before it.
pub fn parse_bbl_reader<R: Read, L: FlightLogListener>(
    reader: R,
    listener: &mut L,
    options: ParseOptions,
) -> Result<(LogHeader, LogStatistics)> {
    let mut source = ReadSource::new(reader);
    let parsed = parse_log_stream(&mut source, listener, options);

    if let Some(err) = source.take_error() {
        return Err(anyhow::Error::new(BBLError::Io(err))
            .context("Failed to read blackbox log stream"));
    }
    parsed.context("Failed to parse blackbox log stream")
}

/// Parse one log into an owned [`BBLLog`]. A fatal error is recorded in
/// [`BBLLog::outcome`] alongside the statistics gathered before it.
pub fn parse_single_log(
    log_data: &[u8],
    log_number: usize,
    total_logs: usize,
    options: ParseOptions,
) -> BBLLog {
    let mut collector = FrameCollector::new();
    let mut parser = FlightLogParser::new(SliceSource::new(log_data));
    let result = parser.parse(&mut collector, options);
    let (header, stats) = parser.into_parts();

    let outcome = match result {
        Ok(()) => ParseOutcome::Completed,
        Err(err) => {
            warn!("Log {log_number} of {total_logs} failed: {err}");
            ParseOutcome::Failed {
                message: err.to_string(),
                configuration_error: err.is_configuration_error(),
            }
        }
    };

    BBLLog {
        log_number,
        total_logs,
        header,
        stats,
        frames: collector.frames,
        events: collector.events,
        outcome,
    }
}

/// Parse BBL data from memory and return all logs
pub fn parse_bbl_bytes_all_logs(data: &[u8], options: ParseOptions) -> Result<Vec<BBLLog>> {
    debug!("Parsing {} bytes of blackbox data", data.len());

    let log_starts = find_log_starts(data);
    if log_starts.is_empty() {
        return Err(BBLError::NoLogsFound.into());
    }
    info!("Found {} log(s) in data", log_starts.len());

    let total_logs = log_starts.len();
    let logs = log_starts
        .iter()
        .enumerate()
        .map(|(log_index, &start)| {
            let end = log_starts
                .get(log_index + 1)
                .copied()
                .unwrap_or(data.len());
            debug!(
                "Parsing log {} of {total_logs} (bytes {start}..{end})",
                log_index + 1
            );
            parse_single_log(&data[start..end], log_index + 1, total_logs, options)
        })
        .collect();

    Ok(logs)
}

/// Parse BBL data from memory and return the first log
pub fn parse_bbl_bytes(data: &[u8], options: ParseOptions) -> Result<BBLLog> {
    parse_bbl_bytes_all_logs(data, options)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No logs found in BBL data"))
}

/// Parse BBL file and return all logs
pub fn parse_bbl_file_all_logs(file_path: &Path, options: ParseOptions) -> Result<Vec<BBLLog>> {
    let file_data = std::fs::read(file_path)
        .with_context(|| format!("Failed to read BBL file: {:?}", file_path))?;

    parse_bbl_bytes_all_logs(&file_data, options)
        .with_context(|| format!("Failed to parse BBL file: {:?}", file_path))
}

/// Parse BBL file and return the first log
pub fn parse_bbl_file(file_path: &Path, options: ParseOptions) -> Result<BBLLog> {
    parse_bbl_file_all_logs(file_path, options)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No logs found in BBL file"))
}
