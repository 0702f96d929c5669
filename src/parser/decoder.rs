use crate::types::{FieldValues, SysConfig};

// BBL encoding ids as written in "Field X encoding" header lines
pub const ENCODING_SIGNED_VB: u32 = 0;
pub const ENCODING_UNSIGNED_VB: u32 = 1;
pub const ENCODING_NEG_14BIT: u32 = 3;
pub const ENCODING_ELIAS_DELTA_U32: u32 = 4;
pub const ENCODING_ELIAS_DELTA_S32: u32 = 5;
pub const ENCODING_TAG8_8SVB: u32 = 6;
pub const ENCODING_TAG2_3S32: u32 = 7;
pub const ENCODING_TAG8_4S16: u32 = 8;
pub const ENCODING_NULL: u32 = 9;
pub const ENCODING_ELIAS_GAMMA_U32: u32 = 10;
pub const ENCODING_ELIAS_GAMMA_S32: u32 = 11;

// Predictor ids as written in "Field X predictor" header lines
pub const PREDICT_0: u32 = 0;
pub const PREDICT_PREVIOUS: u32 = 1;
pub const PREDICT_STRAIGHT_LINE: u32 = 2;
pub const PREDICT_AVERAGE_2: u32 = 3;
pub const PREDICT_MINTHROTTLE: u32 = 4;
pub const PREDICT_MOTOR_0: u32 = 5;
pub const PREDICT_INC: u32 = 6;
pub const PREDICT_HOME_COORD: u32 = 7;
pub const PREDICT_1500: u32 = 8;
pub const PREDICT_VBATREF: u32 = 9;
pub const PREDICT_LAST_MAIN_FRAME_TIME: u32 = 10;

/// How a field's raw value is laid out in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    SignedVb,
    UnsignedVb,
    Neg14Bit,
    EliasDeltaU32,
    EliasDeltaS32,
    Tag8_8Svb,
    Tag2_3S32,
    Tag8_4S16,
    Null,
    EliasGammaU32,
    EliasGammaS32,
}

impl Encoding {
    pub fn id(self) -> u32 {
        match self {
            Encoding::SignedVb => ENCODING_SIGNED_VB,
            Encoding::UnsignedVb => ENCODING_UNSIGNED_VB,
            Encoding::Neg14Bit => ENCODING_NEG_14BIT,
            Encoding::EliasDeltaU32 => ENCODING_ELIAS_DELTA_U32,
            Encoding::EliasDeltaS32 => ENCODING_ELIAS_DELTA_S32,
            Encoding::Tag8_8Svb => ENCODING_TAG8_8SVB,
            Encoding::Tag2_3S32 => ENCODING_TAG2_3S32,
            Encoding::Tag8_4S16 => ENCODING_TAG8_4S16,
            Encoding::Null => ENCODING_NULL,
            Encoding::EliasGammaU32 => ENCODING_ELIAS_GAMMA_U32,
            Encoding::EliasGammaS32 => ENCODING_ELIAS_GAMMA_S32,
        }
    }

    /// Byte-level codecs start on a byte boundary. Bit-level codes continue
    /// from the current bit and `Null` reads nothing.
    pub fn needs_byte_alignment(self) -> bool {
        matches!(
            self,
            Encoding::SignedVb
                | Encoding::UnsignedVb
                | Encoding::Neg14Bit
                | Encoding::Tag8_8Svb
                | Encoding::Tag2_3S32
                | Encoding::Tag8_4S16
        )
    }
}

impl TryFrom<u32> for Encoding {
    type Error = u32;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Ok(match id {
            ENCODING_SIGNED_VB => Encoding::SignedVb,
            ENCODING_UNSIGNED_VB => Encoding::UnsignedVb,
            ENCODING_NEG_14BIT => Encoding::Neg14Bit,
            ENCODING_ELIAS_DELTA_U32 => Encoding::EliasDeltaU32,
            ENCODING_ELIAS_DELTA_S32 => Encoding::EliasDeltaS32,
            ENCODING_TAG8_8SVB => Encoding::Tag8_8Svb,
            ENCODING_TAG2_3S32 => Encoding::Tag2_3S32,
            ENCODING_TAG8_4S16 => Encoding::Tag8_4S16,
            ENCODING_NULL => Encoding::Null,
            ENCODING_ELIAS_GAMMA_U32 => Encoding::EliasGammaU32,
            ENCODING_ELIAS_GAMMA_S32 => Encoding::EliasGammaS32,
            other => return Err(other),
        })
    }
}

/// How a field's absolute value is reconstructed from its raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predictor {
    Zero,
    Previous,
    StraightLine,
    Average2,
    MinThrottle,
    Motor0,
    Increment,
    HomeCoord,
    /// Second half of a home coordinate pair. Never written to logs; the
    /// parser rewrites the second of two adjacent `HomeCoord` fields to this.
    HomeCoord1,
    Const1500,
    VbatRef,
    LastMainFrameTime,
}

impl Predictor {
    /// Wire id, `None` for predictors that only exist inside the decoder
    pub fn id(self) -> Option<u32> {
        Some(match self {
            Predictor::Zero => PREDICT_0,
            Predictor::Previous => PREDICT_PREVIOUS,
            Predictor::StraightLine => PREDICT_STRAIGHT_LINE,
            Predictor::Average2 => PREDICT_AVERAGE_2,
            Predictor::MinThrottle => PREDICT_MINTHROTTLE,
            Predictor::Motor0 => PREDICT_MOTOR_0,
            Predictor::Increment => PREDICT_INC,
            Predictor::HomeCoord => PREDICT_HOME_COORD,
            Predictor::HomeCoord1 => return None,
            Predictor::Const1500 => PREDICT_1500,
            Predictor::VbatRef => PREDICT_VBATREF,
            Predictor::LastMainFrameTime => PREDICT_LAST_MAIN_FRAME_TIME,
        })
    }
}

impl TryFrom<u32> for Predictor {
    type Error = u32;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Ok(match id {
            PREDICT_0 => Predictor::Zero,
            PREDICT_PREVIOUS => Predictor::Previous,
            PREDICT_STRAIGHT_LINE => Predictor::StraightLine,
            PREDICT_AVERAGE_2 => Predictor::Average2,
            PREDICT_MINTHROTTLE => Predictor::MinThrottle,
            PREDICT_MOTOR_0 => Predictor::Motor0,
            PREDICT_INC => Predictor::Increment,
            PREDICT_HOME_COORD => Predictor::HomeCoord,
            PREDICT_1500 => Predictor::Const1500,
            PREDICT_VBATREF => Predictor::VbatRef,
            PREDICT_LAST_MAIN_FRAME_TIME => Predictor::LastMainFrameTime,
            other => return Err(other),
        })
    }
}

/// State outside the frame being decoded that predictors may refer to.
///
/// Field references are checked when the layouts are compiled, so an index
/// here is `None` only for predictors no compiled field uses.
#[derive(Debug, Clone, Copy)]
pub struct PredictionContext<'a> {
    pub sysconfig: &'a SysConfig,
    pub motor0_index: Option<usize>,
    /// Last published GPS home frame
    pub home: &'a FieldValues,
    pub home_indexes: [Option<usize>; 2],
    /// Time of the newest main frame in history
    pub last_main_frame_time: Option<i32>,
}

/// Apply predictor to a raw field value.
///
/// Arithmetic is done on the raw 32-bit patterns and wraps, so signed and
/// unsigned fields share one path. `Increment` is resolved by the frame
/// decoder without a raw value and passes through here unchanged.
#[allow(clippy::too_many_arguments)]
pub fn apply_predictor(
    predictor: Predictor,
    field_index: usize,
    signed: bool,
    raw_value: u32,
    current_frame: &[i32],
    previous_frame: Option<&FieldValues>,
    previous2_frame: Option<&FieldValues>,
    ctx: &PredictionContext<'_>,
) -> i32 {
    // Without an older frame, the previous frame stands in for it
    let history = previous_frame.map(|prev| {
        let prev2 = previous2_frame.unwrap_or(prev);
        (prev[field_index] as u32, prev2[field_index] as u32)
    });

    let value = match predictor {
        Predictor::Zero | Predictor::Increment => raw_value,

        Predictor::MinThrottle => raw_value.wrapping_add(ctx.sysconfig.min_throttle as u32),

        Predictor::Const1500 => raw_value.wrapping_add(1500),

        Predictor::Motor0 => {
            let motor0 = ctx
                .motor0_index
                .and_then(|index| current_frame.get(index))
                .copied()
                .unwrap_or(0);
            raw_value.wrapping_add(motor0 as u32)
        }

        Predictor::VbatRef => raw_value.wrapping_add(ctx.sysconfig.vbat_ref as u32),

        Predictor::Previous => match history {
            Some((prev, _)) => raw_value.wrapping_add(prev),
            None => raw_value,
        },

        Predictor::StraightLine => match history {
            Some((prev, prev2)) => {
                raw_value.wrapping_add(prev.wrapping_mul(2).wrapping_sub(prev2))
            }
            None => raw_value,
        },

        Predictor::Average2 => match history {
            Some((prev, prev2)) => {
                let sum = prev.wrapping_add(prev2);
                let average = if signed {
                    ((sum as i32) / 2) as u32
                } else {
                    sum / 2
                };
                raw_value.wrapping_add(average)
            }
            None => raw_value,
        },

        Predictor::HomeCoord | Predictor::HomeCoord1 => {
            let slot = if predictor == Predictor::HomeCoord { 0 } else { 1 };
            let home = ctx.home_indexes[slot]
                .map(|index| ctx.home[index])
                .unwrap_or(0);
            raw_value.wrapping_add(home as u32)
        }

        Predictor::LastMainFrameTime => match ctx.last_main_frame_time {
            Some(time) => raw_value.wrapping_add(time as u32),
            None => raw_value,
        },
    };

    value as i32
}
