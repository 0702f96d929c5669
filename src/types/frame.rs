#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of fields a single frame type may declare
pub const MAX_FIELDS: usize = 128;

/// Frames longer than this (in bytes, marker included) are considered corrupt
pub const MAX_FRAME_LENGTH: usize = 256;

/// The frame types that can appear in the data section of a log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameKind {
    /// `I`: full snapshot of the main fields
    Intra,
    /// `P`: main fields predicted from the previous main frames
    Inter,
    /// `G`: GPS position
    Gps,
    /// `H`: GPS home position
    GpsHome,
    /// `E`: discrete event
    Event,
    /// `S`: slowly-changing state
    Slow,
}

impl FrameKind {
    pub const ALL: [FrameKind; 6] = [
        FrameKind::Intra,
        FrameKind::Inter,
        FrameKind::Gps,
        FrameKind::GpsHome,
        FrameKind::Event,
        FrameKind::Slow,
    ];

    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            b'I' => Some(FrameKind::Intra),
            b'P' => Some(FrameKind::Inter),
            b'G' => Some(FrameKind::Gps),
            b'H' => Some(FrameKind::GpsHome),
            b'E' => Some(FrameKind::Event),
            b'S' => Some(FrameKind::Slow),
            _ => None,
        }
    }

    pub fn marker(self) -> u8 {
        match self {
            FrameKind::Intra => b'I',
            FrameKind::Inter => b'P',
            FrameKind::Gps => b'G',
            FrameKind::GpsHome => b'H',
            FrameKind::Event => b'E',
            FrameKind::Slow => b'S',
        }
    }

    pub fn marker_char(self) -> char {
        self.marker() as char
    }

    /// Position of this kind in [`FrameKind::ALL`], used to index per-kind tables
    pub fn index(self) -> usize {
        match self {
            FrameKind::Intra => 0,
            FrameKind::Inter => 1,
            FrameKind::Gps => 2,
            FrameKind::GpsHome => 3,
            FrameKind::Event => 4,
            FrameKind::Slow => 5,
        }
    }

    /// Intra and inter frames share the main field layout and history
    pub fn is_main(self) -> bool {
        matches!(self, FrameKind::Intra | FrameKind::Inter)
    }
}

/// Field definition for a frame type, as declared by the log header.
///
/// Predictor and encoding are kept as the raw ids from the header text;
/// they are checked and converted to typed values when data begins.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldDefinition {
    pub name: String,
    pub signed: bool,
    pub predictor: u32,
    pub encoding: u32,
}

/// Frame definition containing field specifications
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameDefinition {
    pub fields: Vec<FieldDefinition>,
    pub field_names: Vec<String>,
    pub count: usize,
}

impl FrameDefinition {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            field_names: Vec::new(),
            count: 0,
        }
    }

    /// Build a definition from field names, truncating to [`MAX_FIELDS`]
    pub fn from_field_names(mut names: Vec<String>) -> Self {
        names.truncate(MAX_FIELDS);
        let fields = names
            .iter()
            .map(|name| FieldDefinition {
                name: name.clone(),
                signed: false,
                predictor: 0,
                encoding: 0,
            })
            .collect();
        let count = names.len();
        Self {
            fields,
            field_names: names,
            count,
        }
    }

    pub fn update_signed(&mut self, signed_data: &[bool]) {
        for (field, &signed) in self.fields.iter_mut().zip(signed_data) {
            field.signed = signed;
        }
    }

    pub fn update_predictors(&mut self, predictors: &[u32]) {
        for (field, &predictor) in self.fields.iter_mut().zip(predictors) {
            field.predictor = predictor;
        }
    }

    pub fn update_encoding(&mut self, encodings: &[u32]) {
        for (field, &encoding) in self.fields.iter_mut().zip(encodings) {
            field.encoding = encoding;
        }
    }

    pub fn is_defined(&self) -> bool {
        self.count > 0
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == name)
    }
}

impl Default for FrameDefinition {
    fn default() -> Self {
        Self::new()
    }
}

/// Values of one decoded frame, indexed by field position
pub type FieldValues = [i32; MAX_FIELDS];

/// Three-slot ring of main-frame buffers.
///
/// `current` is where the next main frame is decoded. `previous` and
/// `previous2` index the last two accepted main frames and are `None` while
/// no valid history of that age exists. After an intra frame both point at
/// the same slot, so inter-frame deltas never reach across a resync.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    slots: [FieldValues; 3],
    current: usize,
    previous: Option<usize>,
    previous2: Option<usize>,
}

impl HistoryRing {
    pub fn new() -> Self {
        Self {
            slots: [[0; MAX_FIELDS]; 3],
            current: 0,
            previous: None,
            previous2: None,
        }
    }

    pub fn current(&self) -> &FieldValues {
        &self.slots[self.current]
    }

    pub fn previous(&self) -> Option<&FieldValues> {
        self.previous.map(|i| &self.slots[i])
    }

    pub fn previous2(&self) -> Option<&FieldValues> {
        self.previous2.map(|i| &self.slots[i])
    }

    /// Borrow the decode slot mutably alongside the two history slots
    pub fn split(&mut self) -> (&mut FieldValues, Option<&FieldValues>, Option<&FieldValues>) {
        let (before, rest) = self.slots.split_at_mut(self.current);
        let (current, after) = rest.split_at_mut(1);
        let (before, after): (&[FieldValues], &[FieldValues]) = (before, after);

        (
            &mut current[0],
            history_slot(before, after, self.previous),
            history_slot(before, after, self.previous2),
        )
    }

    /// An intra frame was accepted: it becomes both history entries
    pub fn rotate_intra(&mut self) {
        self.previous = Some(self.current);
        self.previous2 = Some(self.current);
        self.advance();
    }

    /// An inter frame was accepted: shift history by one
    pub fn rotate_inter(&mut self) {
        self.previous2 = self.previous;
        self.previous = Some(self.current);
        self.advance();
    }

    /// Drop all history so the next inter frame has nothing to predict from
    pub fn invalidate(&mut self) {
        self.previous = None;
        self.previous2 = None;
    }

    fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }
}

/// Slot `index` of a ring split around the decode slot; the decode slot itself is `None`
fn history_slot<'a>(
    before: &'a [FieldValues],
    after: &'a [FieldValues],
    index: Option<usize>,
) -> Option<&'a FieldValues> {
    let index = index?;
    if index < before.len() {
        before.get(index)
    } else {
        after.get(index.checked_sub(before.len() + 1)?)
    }
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned copy of one frame delivered to a listener
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodedFrame {
    pub kind: FrameKind,
    pub valid: bool,
    /// Empty when the frame was corrupt or rejected
    pub values: Vec<i32>,
    pub offset: u64,
    pub size: usize,
}

impl DecodedFrame {
    pub fn is_corrupt(&self) -> bool {
        !self.valid && self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<i32> {
        self.values.get(index).copied()
    }
}
