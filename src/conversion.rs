//! Unit and flag conversions for decoded field values
//!
//! None of this is needed to decode a log. These helpers turn raw sensor
//! readings into physical units using the calibration values from the log
//! header, and render the slow-frame flag fields as text.

use semver::Version;

use crate::types::SysConfig;

/// ADC reference voltage in tenths of a volt
const ADC_VREF: i64 = 33;

/// Names of the flight mode flag bits, lowest bit first
pub const FLIGHT_MODE_NAMES: [&str; 10] = [
    "ANGLE_MODE",
    "HORIZON_MODE",
    "MAG",
    "BARO",
    "GPS_HOME",
    "GPS_HOLD",
    "HEADFREE",
    "AUTOTUNE",
    "PASSTHRU",
    "SONAR",
];

/// Names of the flight state flag bits, lowest bit first
pub const FLIGHT_STATE_NAMES: [&str; 5] = [
    "GPS_FIX_HOME",
    "GPS_FIX",
    "CALIBRATE_MAG",
    "SMALL_ANGLE",
    "FIXED_WING",
];

pub const FAILSAFE_PHASE_NAMES: [&str; 4] = ["IDLE", "RX_LOSS_DETECTED", "LANDING", "LANDED"];

impl SysConfig {
    /// Battery voltage in millivolts from a 12-bit ADC reading
    pub fn vbat_adc_to_millivolts(&self, vbat_adc: u16) -> u32 {
        // vbatscale is premultiplied by 100
        (vbat_adc as i64 * ADC_VREF * 10 * self.vbat_scale as i64 / 0xFFF) as u32
    }

    /// Current draw in milliamps from a 12-bit ADC reading
    pub fn amperage_adc_to_milliamps(&self, amperage_adc: u16) -> i32 {
        if self.current_meter_scale == 0 {
            return 0;
        }
        let millivolts = amperage_adc as i64 * ADC_VREF * 100 / 4095
            - self.current_meter_offset as i64;

        (millivolts * 10000 / self.current_meter_scale as i64) as i32
    }

    /// Guess the battery cell count from the reference voltage at arming
    pub fn estimate_num_cells(&self) -> u32 {
        let ref_voltage = self.vbat_adc_to_millivolts(self.vbat_ref) / 100;

        (1..8)
            .find(|&cells| ref_voltage < cells * self.vbat_max_cell_voltage as u32)
            .unwrap_or(8)
    }

    pub fn acceleration_raw_to_gs(&self, acc_raw: i32) -> f64 {
        acc_raw as f64 / self.acc_1g as f64
    }

    /// The gyro scale is in radians per microsecond
    pub fn gyro_to_radians_per_second(&self, gyro_raw: i32) -> f64 {
        self.gyro_scale as f64 * 1_000_000.0 * gyro_raw as f64
    }
}

fn format_flags(flags: u32, names: &[&str]) -> String {
    let set: Vec<&str> = names
        .iter()
        .enumerate()
        .filter(|(bit, _)| flags & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect();

    if set.is_empty() {
        "0".to_string()
    } else {
        set.join("|")
    }
}

/// Format flight mode flags as `|`-separated names, `0` when none are set
pub fn format_flight_mode_flags(flags: u32) -> String {
    format_flags(flags, &FLIGHT_MODE_NAMES)
}

/// Format state flags as `|`-separated names, `0` when none are set
pub fn format_state_flags(flags: u32) -> String {
    format_flags(flags, &FLIGHT_STATE_NAMES)
}

/// Format failsafe phase; phases without a name are printed as numbers
pub fn format_failsafe_phase(phase: u32) -> String {
    FAILSAFE_PHASE_NAMES
        .get(phase as usize)
        .map_or_else(|| phase.to_string(), |name| name.to_string())
}

/// Convert GPS coordinate from raw value to degrees
pub fn convert_gps_coordinate(raw_value: i32) -> f64 {
    // GPS coordinates are stored as degrees * 10000000
    raw_value as f64 / 10_000_000.0
}

/// Extract version from firmware revision string
pub fn extract_firmware_version(firmware_revision: &str) -> Option<Version> {
    // Strings like "Cleanflight 1.9.0 (5d4b4d4) STM32F10X" or "Baseflight v2.4.1"
    firmware_revision
        .split_whitespace()
        .map(|word| word.trim_start_matches(['v', 'V']))
        .find_map(|word| Version::parse(word).ok())
}
