use std::f64::consts::PI;

use log::{trace, warn};

use crate::parser::helpers::{parse_comma_separated, parse_hex_u32, parse_leading_int};
use crate::parser::stream::{BitReader, ByteSource};
use crate::types::{
    FirmwareType, FrameDefinition, FrameKind, GpsFieldIndexes, GpsHomeFieldIndexes, LogHeader,
    MainFieldIndexes, SlowFieldIndexes, SysConfig, MAX_FIELDS,
};

/// Longest header line accepted, in bytes after the `H `
const MAX_HEADER_LINE_LENGTH: usize = 1024;

/// Read the remainder of a header line whose `H` marker was already consumed.
///
/// Returns the key and value split at the first `:`. Lines that do not start
/// with a space, contain a NUL byte, lack a separator, are longer than
/// [`MAX_HEADER_LINE_LENGTH`] or hit the end of the stream are dropped.
pub fn read_header_line<S: ByteSource>(stream: &mut BitReader<S>) -> Option<(String, String)> {
    if stream.peek_byte() != Some(b' ') {
        return None;
    }
    stream.read_byte();

    let mut line = Vec::with_capacity(64);
    let mut separator = None;
    loop {
        if line.len() >= MAX_HEADER_LINE_LENGTH {
            return None;
        }
        match stream.read_byte() {
            None | Some(b'\0') => return None,
            Some(b'\n') => break,
            Some(b':') if separator.is_none() => {
                separator = Some(line.len());
                line.push(b':');
            }
            Some(byte) => line.push(byte),
        }
    }

    let separator = separator?;
    let name = String::from_utf8_lossy(&line[..separator]).into_owned();
    let value = String::from_utf8_lossy(&line[separator + 1..]).into_owned();
    Some((name, value))
}

/// Apply one `name:value` header pair to the header being built
pub fn apply_header_line(header: &mut LogHeader, name: &str, value: &str) {
    trace!("Header {name}: {value}");
    header.all_headers.push(format!("{name}:{value}"));

    if let Some(field_key) = name.strip_prefix("Field ") {
        apply_field_line(header, field_key, value);
        return;
    }

    let sysconfig = &mut header.sysconfig;
    match name {
        "I interval" => {
            header.frame_interval_i = parse_leading_int(value).max(1) as u32;
        }
        "P interval" => {
            if let Some((num, denom)) = value.split_once('/') {
                header.frame_interval_p_num = parse_leading_int(num).max(0) as u32;
                header.frame_interval_p_denom = parse_leading_int(denom).max(0) as u32;
            }
        }
        "Data version" => header.data_version = parse_leading_int(value),
        "Firmware type" => {
            sysconfig.firmware_type = if value == "Cleanflight" {
                FirmwareType::Cleanflight
            } else {
                FirmwareType::Baseflight
            };
            convert_cleanflight_gyro_scale(sysconfig);
        }
        "Firmware revision" => sysconfig.firmware_revision = value.to_string(),
        "minthrottle" => sysconfig.min_throttle = parse_leading_int(value),
        "maxthrottle" => sysconfig.max_throttle = parse_leading_int(value),
        "rcRate" => sysconfig.rc_rate = parse_leading_int(value) as u32,
        "yawRate" => sysconfig.yaw_rate = parse_leading_int(value) as u32,
        "vbatscale" => sysconfig.vbat_scale = parse_leading_int(value) as u8,
        "vbatref" => sysconfig.vbat_ref = parse_leading_int(value) as u16,
        "vbatcellvoltage" => {
            let mut cells = parse_comma_separated(value, 3);
            cells.resize(3, 0);
            sysconfig.vbat_min_cell_voltage = cells[0] as u8;
            sysconfig.vbat_warning_cell_voltage = cells[1] as u8;
            sysconfig.vbat_max_cell_voltage = cells[2] as u8;
        }
        "currentMeter" => {
            let mut params = parse_comma_separated(value, 2);
            params.resize(2, 0);
            sysconfig.current_meter_offset = params[0] as i16;
            sysconfig.current_meter_scale = params[1] as i16;
        }
        "gyro.scale" => {
            sysconfig.gyro_scale = f32::from_bits(parse_hex_u32(value));
            sysconfig.gyro_scale_set = true;
            sysconfig.gyro_scale_converted = false;
            convert_cleanflight_gyro_scale(sysconfig);
        }
        "acc_1G" => sysconfig.acc_1g = parse_leading_int(value) as u16,
        _ => {}
    }
}

/// Cleanflight logs degrees per second where Baseflight logs radians per
/// microsecond. Converts once both the scale and the firmware type are known.
fn convert_cleanflight_gyro_scale(sysconfig: &mut SysConfig) {
    if sysconfig.firmware_type == FirmwareType::Cleanflight
        && sysconfig.gyro_scale_set
        && !sysconfig.gyro_scale_converted
    {
        sysconfig.gyro_scale = (sysconfig.gyro_scale as f64 * (PI / 180.0) * 0.000001) as f32;
        sysconfig.gyro_scale_converted = true;
    }
}

/// Handle `Field <marker> name|signed|predictor|encoding`
fn apply_field_line(header: &mut LogHeader, field_key: &str, value: &str) {
    let mut parts = field_key.splitn(2, ' ');
    let kind = parts
        .next()
        .and_then(|marker| marker.bytes().next())
        .and_then(FrameKind::from_marker);
    let (Some(kind), Some(property)) = (kind, parts.next()) else {
        return;
    };

    match property {
        "name" => define_field_names(header, kind, value),
        "signed" => {
            let signed: Vec<bool> = parse_comma_separated(value, MAX_FIELDS)
                .into_iter()
                .map(|flag| flag != 0)
                .collect();
            header.frame_def_mut(kind).update_signed(&signed);
            // P frames share the main field layout
            if kind == FrameKind::Intra {
                header.frame_def_mut(FrameKind::Inter).update_signed(&signed);
            }
        }
        "predictor" => {
            let ids = parse_ids(value);
            header.frame_def_mut(kind).update_predictors(&ids);
        }
        "encoding" => {
            let ids = parse_ids(value);
            header.frame_def_mut(kind).update_encoding(&ids);
        }
        _ => {}
    }
}

fn parse_ids(value: &str) -> Vec<u32> {
    parse_comma_separated(value, MAX_FIELDS)
        .into_iter()
        .map(|id| id as u32)
        .collect()
}

fn define_field_names(header: &mut LogHeader, kind: FrameKind, value: &str) {
    if header.frame_def(kind).is_defined() {
        warn!(
            "Ignoring redefinition of '{}' frame field names",
            kind.marker_char()
        );
        return;
    }

    let names: Vec<String> = if value.is_empty() {
        Vec::new()
    } else {
        value.split(',').map(str::to_string).collect()
    };
    if names.len() > MAX_FIELDS {
        warn!(
            "'{}' frame declares {} fields, keeping the first {MAX_FIELDS}",
            kind.marker_char(),
            names.len()
        );
    }

    let frame_def = FrameDefinition::from_field_names(names);
    identify_fields(header, kind, &frame_def);

    if kind == FrameKind::Intra {
        // P frames reuse the I frame's names and count; keep any P ids already read
        let inter = header.frame_def(FrameKind::Inter);
        let predictors: Vec<u32> = inter.fields.iter().map(|f| f.predictor).collect();
        let encodings: Vec<u32> = inter.fields.iter().map(|f| f.encoding).collect();

        let mut inter = FrameDefinition::from_field_names(frame_def.field_names.clone());
        inter.update_predictors(&predictors);
        inter.update_encoding(&encodings);
        *header.frame_def_mut(FrameKind::Inter) = inter;
    }

    *header.frame_def_mut(kind) = frame_def;
}

/// Record where the well-known fields of `kind` live
pub fn identify_fields(header: &mut LogHeader, kind: FrameKind, frame_def: &FrameDefinition) {
    match kind {
        FrameKind::Intra => header.main_indexes = identify_main_fields(frame_def),
        FrameKind::Gps => header.gps_indexes = identify_gps_fields(frame_def),
        FrameKind::GpsHome => header.gps_home_indexes = identify_gps_home_fields(frame_def),
        FrameKind::Slow => header.slow_indexes = identify_slow_fields(frame_def),
        FrameKind::Inter | FrameKind::Event => {}
    }
}

/// Parse the `N]` of an indexed field name, returning it if it fits `len`
fn bracket_index(rest: &str, len: usize) -> Option<usize> {
    let index = parse_leading_int(rest);
    (index >= 0 && (index as usize) < len).then_some(index as usize)
}

fn set_indexed(slots: &mut [Option<usize>], rest: &str, field_index: usize) {
    if let Some(slot) = bracket_index(rest, slots.len()) {
        slots[slot] = Some(field_index);
    }
}

fn identify_main_fields(frame_def: &FrameDefinition) -> MainFieldIndexes {
    let mut indexes = MainFieldIndexes::default();

    for (i, name) in frame_def.field_names.iter().enumerate() {
        let name = name.as_str();
        if let Some(rest) = name.strip_prefix("motor[") {
            set_indexed(&mut indexes.motor, rest, i);
        } else if let Some(rest) = name.strip_prefix("rcCommand[") {
            set_indexed(&mut indexes.rc_command, rest, i);
        } else if let Some(rest) = name.strip_prefix("axis") {
            let term = match rest.as_bytes().first() {
                Some(b'P') => 0,
                Some(b'I') => 1,
                Some(b'D') => 2,
                _ => continue,
            };
            if let Some(axis) = rest.get(1..).and_then(|r| r.strip_prefix('[')) {
                set_indexed(&mut indexes.pid[term], axis, i);
            }
        } else if let Some(rest) = name
            .strip_prefix("gyroData[")
            .or_else(|| name.strip_prefix("gyroADC["))
        {
            set_indexed(&mut indexes.gyro_adc, rest, i);
        } else if let Some(rest) = name.strip_prefix("magADC[") {
            set_indexed(&mut indexes.mag_adc, rest, i);
        } else if let Some(rest) = name.strip_prefix("accSmooth[") {
            set_indexed(&mut indexes.acc_smooth, rest, i);
        } else if let Some(rest) = name.strip_prefix("servo[") {
            set_indexed(&mut indexes.servo, rest, i);
        } else {
            let slot = match name {
                "vbatLatest" => &mut indexes.vbat_latest,
                "amperageLatest" => &mut indexes.amperage_latest,
                "BaroAlt" => &mut indexes.baro_alt,
                "sonarRaw" => &mut indexes.sonar_raw,
                "rssi" => &mut indexes.rssi,
                "loopIteration" => &mut indexes.loop_iteration,
                "time" => &mut indexes.time,
                _ => continue,
            };
            *slot = Some(i);
        }
    }

    indexes
}

fn identify_gps_fields(frame_def: &FrameDefinition) -> GpsFieldIndexes {
    let mut indexes = GpsFieldIndexes::default();

    for (i, name) in frame_def.field_names.iter().enumerate() {
        if let Some(rest) = name.strip_prefix("GPS_coord[") {
            set_indexed(&mut indexes.coord, rest, i);
            continue;
        }
        let slot = match name.as_str() {
            "time" => &mut indexes.time,
            "GPS_numSat" => &mut indexes.num_sat,
            "GPS_altitude" => &mut indexes.altitude,
            "GPS_speed" => &mut indexes.speed,
            "GPS_ground_course" => &mut indexes.ground_course,
            _ => continue,
        };
        *slot = Some(i);
    }

    indexes
}

fn identify_gps_home_fields(frame_def: &FrameDefinition) -> GpsHomeFieldIndexes {
    let mut indexes = GpsHomeFieldIndexes::default();
    indexes.home[0] = frame_def.position("GPS_home[0]");
    indexes.home[1] = frame_def.position("GPS_home[1]");
    indexes
}

fn identify_slow_fields(frame_def: &FrameDefinition) -> SlowFieldIndexes {
    SlowFieldIndexes {
        flight_mode_flags: frame_def.position("flightModeFlags"),
        state_flags: frame_def.position("stateFlags"),
        failsafe_phase: frame_def.position("failsafePhase"),
    }
}
