use crate::types::frame::{FrameDefinition, FrameKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MAX_MOTORS: usize = 8;
pub const MAX_SERVOS: usize = 8;

/// Which firmware family produced the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FirmwareType {
    #[default]
    Unknown,
    Baseflight,
    Cleanflight,
}

/// Calibration constants of the craft being logged
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SysConfig {
    pub min_throttle: i32,
    pub max_throttle: i32,
    pub rc_rate: u32,
    pub yaw_rate: u32,

    pub acc_1g: u16,
    /// Radians per microsecond per raw gyro unit
    pub gyro_scale: f32,

    pub vbat_scale: u8,
    pub vbat_max_cell_voltage: u8,
    pub vbat_min_cell_voltage: u8,
    pub vbat_warning_cell_voltage: u8,

    pub current_meter_offset: i16,
    pub current_meter_scale: i16,

    pub vbat_ref: u16,

    pub firmware_type: FirmwareType,
    pub firmware_revision: String,

    /// A gyro scale has been read from the header
    pub(crate) gyro_scale_set: bool,
    /// The degrees/s to radians/us conversion has already been applied
    pub(crate) gyro_scale_converted: bool,
}

impl Default for SysConfig {
    fn default() -> Self {
        Self {
            min_throttle: 1150,
            max_throttle: 1850,
            rc_rate: 90,
            yaw_rate: 0,
            // Deliberately meaningless until the header tells us the hardware
            acc_1g: 1,
            gyro_scale: 1.0,
            vbat_scale: 110,
            vbat_max_cell_voltage: 43,
            vbat_min_cell_voltage: 33,
            vbat_warning_cell_voltage: 35,
            current_meter_offset: 0,
            current_meter_scale: 400,
            vbat_ref: 4095,
            firmware_type: FirmwareType::Unknown,
            firmware_revision: String::new(),
            gyro_scale_set: false,
            gyro_scale_converted: false,
        }
    }
}

/// Positions of well-known main-frame fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MainFieldIndexes {
    pub loop_iteration: Option<usize>,
    pub time: Option<usize>,
    /// First dimension is [P, I, D], second is the axis
    pub pid: [[Option<usize>; 3]; 3],
    pub rc_command: [Option<usize>; 4],
    pub vbat_latest: Option<usize>,
    pub amperage_latest: Option<usize>,
    pub mag_adc: [Option<usize>; 3],
    pub baro_alt: Option<usize>,
    pub sonar_raw: Option<usize>,
    pub rssi: Option<usize>,
    pub gyro_adc: [Option<usize>; 3],
    pub acc_smooth: [Option<usize>; 3],
    pub motor: [Option<usize>; MAX_MOTORS],
    pub servo: [Option<usize>; MAX_SERVOS],
}

/// Positions of well-known GPS-frame fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsFieldIndexes {
    pub time: Option<usize>,
    pub num_sat: Option<usize>,
    pub coord: [Option<usize>; 2],
    pub altitude: Option<usize>,
    pub speed: Option<usize>,
    pub ground_course: Option<usize>,
}

/// Positions of the home coordinate fields in GPS-home frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsHomeFieldIndexes {
    pub home: [Option<usize>; 2],
}

/// Positions of the flag fields in slow frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlowFieldIndexes {
    pub flight_mode_flags: Option<usize>,
    pub state_flags: Option<usize>,
    pub failsafe_phase: Option<usize>,
}

/// Everything the header section of a log tells us
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LogHeader {
    pub data_version: i32,
    pub frame_interval_i: u32,
    pub frame_interval_p_num: u32,
    pub frame_interval_p_denom: u32,
    pub sysconfig: SysConfig,
    pub frame_defs: [FrameDefinition; 6],
    pub main_indexes: MainFieldIndexes,
    pub gps_indexes: GpsFieldIndexes,
    pub gps_home_indexes: GpsHomeFieldIndexes,
    pub slow_indexes: SlowFieldIndexes,
    /// Every well-formed header line, without the leading `H `
    pub all_headers: Vec<String>,
}

impl LogHeader {
    pub fn frame_def(&self, kind: FrameKind) -> &FrameDefinition {
        &self.frame_defs[kind.index()]
    }

    pub fn frame_def_mut(&mut self, kind: FrameKind) -> &mut FrameDefinition {
        &mut self.frame_defs[kind.index()]
    }

    /// Index of the loop iteration field in main frames
    pub fn iteration_index(&self) -> usize {
        self.main_indexes.loop_iteration.unwrap_or(0)
    }

    /// Index of the time field in main frames
    pub fn time_index(&self) -> usize {
        self.main_indexes.time.unwrap_or(1)
    }
}

impl Default for LogHeader {
    fn default() -> Self {
        Self {
            data_version: 2,
            frame_interval_i: 32,
            frame_interval_p_num: 1,
            frame_interval_p_denom: 1,
            sysconfig: SysConfig::default(),
            frame_defs: Default::default(),
            main_indexes: MainFieldIndexes::default(),
            gps_indexes: GpsFieldIndexes::default(),
            gps_home_indexes: GpsHomeFieldIndexes::default(),
            slow_indexes: SlowFieldIndexes::default(),
            all_headers: Vec::new(),
        }
    }
}
