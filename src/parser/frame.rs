use log::debug;

use crate::error::{BBLError, Result};
use crate::parser::decoder::{apply_predictor, Encoding, PredictionContext, Predictor};
use crate::parser::stream::{BitReader, ByteSource};
use crate::types::{FieldValues, FrameDefinition, FrameKind, LogHeader};

/// A field definition with its ids checked and converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledField {
    pub signed: bool,
    pub predictor: Predictor,
    pub encoding: Encoding,
}

/// Decoding recipe for one frame type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameLayout {
    pub fields: Vec<CompiledField>,
}

impl FrameLayout {
    /// Convert the textual definition of `kind` into typed fields
    pub fn compile(kind: FrameKind, frame_def: &FrameDefinition) -> Result<Self> {
        let fields = frame_def
            .fields
            .iter()
            .take(frame_def.count)
            .enumerate()
            .map(|(index, field)| -> Result<CompiledField> {
                let predictor = Predictor::try_from(field.predictor).map_err(|id| {
                    BBLError::UnsupportedPredictor {
                        frame: kind.marker_char(),
                        field: index,
                        id,
                    }
                })?;
                let encoding = Encoding::try_from(field.encoding).map_err(|id| {
                    BBLError::UnsupportedEncoding {
                        frame: kind.marker_char(),
                        field: index,
                        id,
                    }
                })?;
                Ok(CompiledField {
                    signed: field.signed,
                    predictor,
                    encoding,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fields })
    }

    pub fn count(&self) -> usize {
        self.fields.len()
    }

    /// Home coordinates share one predictor id in the header but refer to
    /// different home fields; the second of each adjacent pair gets its own.
    fn split_home_coordinate_pairs(&mut self) {
        for i in 1..self.fields.len() {
            if self.fields[i - 1].predictor == Predictor::HomeCoord
                && self.fields[i].predictor == Predictor::HomeCoord
            {
                self.fields[i].predictor = Predictor::HomeCoord1;
            }
        }
    }

    /// Every predictor that reads a well-known field must find it defined
    fn check_references(&self, kind: FrameKind, header: &LogHeader) -> Result<()> {
        for (index, field) in self.fields.iter().enumerate() {
            let reference = match field.predictor {
                Predictor::Motor0 if header.main_indexes.motor[0].is_none() => "motor[0]",
                Predictor::HomeCoord if header.gps_home_indexes.home[0].is_none() => {
                    "GPS_home[0]"
                }
                Predictor::HomeCoord1 if header.gps_home_indexes.home[1].is_none() => {
                    "GPS_home[1]"
                }
                _ => continue,
            };
            return Err(BBLError::UndefinedFieldReference {
                frame: kind.marker_char(),
                field: index,
                reference,
            });
        }
        Ok(())
    }
}

/// Compile the layouts of every defined frame type, indexed by [`FrameKind::index`].
///
/// Event frames carry their own payload format and have no layout.
pub fn compile_layouts(header: &LogHeader) -> Result<[FrameLayout; 6]> {
    let mut layouts: [FrameLayout; 6] = Default::default();

    for kind in FrameKind::ALL {
        let frame_def = header.frame_def(kind);
        if kind == FrameKind::Event || !frame_def.is_defined() {
            continue;
        }

        let mut layout = FrameLayout::compile(kind, frame_def)?;
        if kind == FrameKind::Gps {
            layout.split_home_coordinate_pairs();
        }
        layout.check_references(kind, header)?;

        debug!(
            "Compiled '{}' frame layout with {} fields",
            kind.marker_char(),
            layout.count()
        );
        layouts[kind.index()] = layout;
    }

    Ok(layouts)
}

/// What a frame is decoded against
pub struct FrameContext<'a> {
    pub previous: Option<&'a FieldValues>,
    pub previous2: Option<&'a FieldValues>,
    /// Iterations the sampling rate skipped since the previous main frame
    pub skipped_frames: u32,
    /// Store raw values, without prediction
    pub raw: bool,
    pub data_version: i32,
    pub prediction: PredictionContext<'a>,
}

/// Decode one frame's fields into `dest`.
///
/// The marker byte has already been consumed. Group codecs fill several
/// consecutive fields at once; the stream is byte-aligned afterwards.
pub fn decode_frame<S: ByteSource>(
    stream: &mut BitReader<S>,
    layout: &FrameLayout,
    dest: &mut FieldValues,
    ctx: &FrameContext<'_>,
) {
    let fields = &layout.fields;
    let count = fields.len();
    let mut values = [0i32; 8];
    let mut i = 0;

    while i < count {
        let field = fields[i];

        if field.predictor == Predictor::Increment {
            let previous = ctx.previous.map_or(0, |prev| prev[i]);
            dest[i] = (ctx.skipped_frames as i32)
                .wrapping_add(1)
                .wrapping_add(previous);
            i += 1;
            continue;
        }

        if field.encoding.needs_byte_alignment() {
            stream.align_to_byte();
        }

        let group_size = match field.encoding {
            Encoding::Tag8_4S16 => {
                let mut group = [0i32; 4];
                if ctx.data_version < 2 {
                    stream.read_tag8_4s16_v1(&mut group);
                } else {
                    stream.read_tag8_4s16_v2(&mut group);
                }
                values[..4].copy_from_slice(&group);
                4
            }
            Encoding::Tag2_3S32 => {
                let mut group = [0i32; 3];
                stream.read_tag2_3s32(&mut group);
                values[..3].copy_from_slice(&group);
                3
            }
            Encoding::Tag8_8Svb => {
                // The group is every consecutive field using this encoding, up to 8
                let group_size = fields[i..]
                    .iter()
                    .take(8)
                    .take_while(|f| f.encoding == Encoding::Tag8_8Svb)
                    .count();
                stream.read_tag8_8svb(&mut values[..group_size]);
                group_size
            }
            single => {
                values[0] = read_single_value(stream, single) as i32;
                1
            }
        };

        for (j, &raw_value) in values.iter().enumerate().take(group_size) {
            let index = i + j;
            if index >= count {
                break;
            }
            let predictor = if ctx.raw {
                Predictor::Zero
            } else {
                fields[index].predictor
            };
            let value = apply_predictor(
                predictor,
                index,
                fields[index].signed,
                raw_value as u32,
                &dest[..],
                ctx.previous,
                ctx.previous2,
                &ctx.prediction,
            );
            dest[index] = value;
        }

        i += group_size;
    }

    stream.align_to_byte();
}

fn read_single_value<S: ByteSource>(stream: &mut BitReader<S>, encoding: Encoding) -> u32 {
    match encoding {
        Encoding::SignedVb => stream.read_signed_vb() as u32,
        Encoding::UnsignedVb => stream.read_unsigned_vb(),
        Encoding::Neg14Bit => stream.read_neg_14bit() as u32,
        Encoding::EliasDeltaU32 => stream.read_elias_delta_u32(),
        Encoding::EliasDeltaS32 => stream.read_elias_delta_s32() as u32,
        Encoding::EliasGammaU32 => stream.read_elias_gamma_u32(),
        Encoding::EliasGammaS32 => stream.read_elias_gamma_s32() as u32,
        Encoding::Null => 0,
        // Group encodings are handled by the caller
        Encoding::Tag8_8Svb | Encoding::Tag2_3S32 | Encoding::Tag8_4S16 => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::stream::SliceSource;
    use crate::types::{SysConfig, MAX_FIELDS};

    fn definition(names: &[&str], predictors: &[u32], encodings: &[u32]) -> FrameDefinition {
        let mut frame_def =
            FrameDefinition::from_field_names(names.iter().map(|n| n.to_string()).collect());
        frame_def.update_predictors(predictors);
        frame_def.update_encoding(encodings);
        frame_def
    }

    fn decode(
        data: &[u8],
        layout: &FrameLayout,
        previous: Option<&FieldValues>,
        skipped_frames: u32,
        raw: bool,
    ) -> (FieldValues, u64) {
        let sysconfig = SysConfig::default();
        let home = [0; MAX_FIELDS];
        let ctx = FrameContext {
            previous,
            previous2: previous,
            skipped_frames,
            raw,
            data_version: 2,
            prediction: PredictionContext {
                sysconfig: &sysconfig,
                motor0_index: None,
                home: &home,
                home_indexes: [None, None],
                last_main_frame_time: None,
            },
        };
        let mut stream = BitReader::new(SliceSource::new(data));
        let mut dest = [0; MAX_FIELDS];
        decode_frame(&mut stream, layout, &mut dest, &ctx);
        (dest, stream.position())
    }

    #[test]
    fn test_compile_rejects_unknown_ids() {
        let frame_def = definition(&["a", "b"], &[0, 42], &[1, 1]);
        let err = FrameLayout::compile(FrameKind::Intra, &frame_def).unwrap_err();
        assert!(matches!(
            err,
            BBLError::UnsupportedPredictor {
                frame: 'I',
                field: 1,
                id: 42
            }
        ));

        let frame_def = definition(&["a"], &[0], &[2]);
        let err = FrameLayout::compile(FrameKind::Slow, &frame_def).unwrap_err();
        assert!(matches!(
            err,
            BBLError::UnsupportedEncoding {
                frame: 'S',
                id: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_compile_layouts_home_pairs_and_references() {
        let mut header = LogHeader::default();
        header.frame_defs[FrameKind::Intra.index()] = definition(&["loopIteration"], &[0], &[1]);
        header.frame_defs[FrameKind::Gps.index()] = definition(
            &["time", "GPS_coord[0]", "GPS_coord[1]"],
            &[10, 7, 7],
            &[1, 0, 0],
        );

        // No home frame definition: the first home coordinate has nothing to refer to
        let err = compile_layouts(&header).unwrap_err();
        assert!(matches!(
            err,
            BBLError::UndefinedFieldReference {
                frame: 'G',
                field: 1,
                reference: "GPS_home[0]"
            }
        ));

        header.gps_home_indexes.home = [Some(0), Some(1)];
        let layouts = compile_layouts(&header).expect("layouts compile");
        let gps = &layouts[FrameKind::Gps.index()];
        assert_eq!(gps.fields[1].predictor, Predictor::HomeCoord);
        assert_eq!(gps.fields[2].predictor, Predictor::HomeCoord1);
        assert_eq!(layouts[FrameKind::Slow.index()].count(), 0);
    }

    #[test]
    fn test_compile_motor0_requires_motor_field() {
        let mut header = LogHeader::default();
        header.frame_defs[FrameKind::Intra.index()] =
            definition(&["motor[0]", "motor[1]"], &[4, 5], &[1, 0]);

        assert!(compile_layouts(&header).is_err());
        header.main_indexes.motor[0] = Some(0);
        assert!(compile_layouts(&header).is_ok());
    }

    #[test]
    fn test_decode_mixed_encodings() {
        let layout = FrameLayout::compile(
            FrameKind::Intra,
            &definition(
                &["loopIteration", "time", "axis", "null", "gamma"],
                &[0, 0, 8, 0, 0],
                &[1, 1, 0, 9, 10],
            ),
        )
        .expect("layout");

        // 7, 300 (0xAC 0x02), -20 zigzag 39, null, gamma "011" = 3
        let data = [0x07, 0xAC, 0x02, 0x27, 0b0110_0000, b'I'];
        let (values, position) = decode(&data, &layout, None, 0, false);
        assert_eq!(&values[..5], &[7, 300, 1480, 0, 3]);
        // Trailing bits were aligned away, the next marker is untouched
        assert_eq!(position, 5);

        let (values, _) = decode(&data, &layout, None, 0, true);
        assert_eq!(values[2], -20);
    }

    #[test]
    fn test_decode_increment_skips_codec() {
        let layout = FrameLayout::compile(
            FrameKind::Inter,
            &definition(&["loopIteration", "time"], &[6, 1], &[9, 0]),
        )
        .expect("layout");

        let mut previous = [0; MAX_FIELDS];
        previous[0] = 41;
        previous[1] = 1000;

        // Only the time delta is in the stream
        let (values, position) = decode(&[0x04], &layout, Some(&previous), 0, false);
        assert_eq!(&values[..2], &[42, 1002]);
        assert_eq!(position, 1);

        let (values, _) = decode(&[0x04], &layout, Some(&previous), 3, true);
        assert_eq!(values[0], 45);
    }

    #[test]
    fn test_decode_tag8_8svb_group_boundaries() {
        // Two grouped fields followed by a plain unsigned field
        let layout = FrameLayout::compile(
            FrameKind::Intra,
            &definition(&["a", "b", "c"], &[0, 0, 0], &[6, 6, 1]),
        )
        .expect("layout");

        let (values, position) = decode(&[0b10, 0x05, 0x09], &layout, None, 0, false);
        assert_eq!(&values[..3], &[0, -3, 9]);
        assert_eq!(position, 3);
    }

    #[test]
    fn test_decode_partial_group_at_end_of_frame() {
        // A tag2_3s32 group with only two fields left assigns just those two
        let layout = FrameLayout::compile(
            FrameKind::Intra,
            &definition(&["a", "b"], &[0, 0], &[7, 7]),
        )
        .expect("layout");

        let (values, _) = decode(&[0b00_01_11_01], &layout, None, 0, false);
        assert_eq!(&values[..3], &[1, -1, 0]);
    }
}
