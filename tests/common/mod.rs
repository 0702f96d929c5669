//! Minimal blackbox log writer used to synthesize test logs
#![allow(dead_code)]

pub const LOG_START: &str = "H Product:Blackbox flight data recorder by Nicholas Sherlock\n";

/// MSB-first bit writer matching the decoder's bit order
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bits(&mut self, value: u32, count: u32) {
        for i in (0..count).rev() {
            let bit = ((value >> i) & 1) as u8;
            self.current |= bit << (7 - self.used);
            self.used += 1;
            if self.used == 8 {
                self.bytes.push(self.current);
                self.current = 0;
                self.used = 0;
            }
        }
    }

    pub fn align(&mut self) {
        if self.used > 0 {
            self.bytes.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_elias_gamma_u32(&mut self, value: u32) {
        assert!(value >= 1, "Elias gamma cannot encode zero");
        let length = 32 - value.leading_zeros();
        self.write_bits(0, length - 1);
        self.write_bits(value, length);
    }

    pub fn write_elias_delta_u32(&mut self, value: u32) {
        assert!(value >= 1, "Elias delta cannot encode zero");
        let length = 32 - value.leading_zeros();
        self.write_elias_gamma_u32(length);
        self.write_bits(value, length - 1);
    }

    /// Signed codes carry `zigzag(value)`, so zero cannot be written
    pub fn write_elias_gamma_s32(&mut self, value: i32) {
        self.write_elias_gamma_u32(zigzag(value));
    }

    pub fn write_elias_delta_s32(&mut self, value: i32) {
        self.write_elias_delta_u32(zigzag(value));
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align();
        self.bytes
    }
}

pub fn zigzag(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn uvb(mut value: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    while value >= 0x80 {
        bytes.push((value as u8) | 0x80);
        value >>= 7;
    }
    bytes.push(value as u8);
    bytes
}

pub fn svb(value: i32) -> Vec<u8> {
    uvb(zigzag(value))
}

/// Signed VB group with a presence byte; zero values are left out
pub fn tag8_8svb(values: &[i32]) -> Vec<u8> {
    if values.len() == 1 {
        return svb(values[0]);
    }
    let mut header = 0u8;
    let mut body = Vec::new();
    for (i, &value) in values.iter().enumerate() {
        if value != 0 {
            header |= 1 << i;
            body.extend(svb(value));
        }
    }
    let mut bytes = vec![header];
    bytes.extend(body);
    bytes
}

/// Log bytes assembled from header lines and frames
pub struct LogBuilder {
    data: Vec<u8>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self {
            data: LOG_START.as_bytes().to_vec(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.data
            .extend_from_slice(format!("H {name}:{value}\n").as_bytes());
        self
    }

    /// Declare a frame type's fields as `(name, signed, predictor, encoding)`
    pub fn fields(self, marker: char, fields: &[(&str, bool, u32, u32)]) -> Self {
        let names: Vec<&str> = fields.iter().map(|f| f.0).collect();
        let signed: Vec<String> = fields.iter().map(|f| u8::from(f.1).to_string()).collect();
        let predictors: Vec<String> = fields.iter().map(|f| f.2.to_string()).collect();
        let encodings: Vec<String> = fields.iter().map(|f| f.3.to_string()).collect();

        self.header(&format!("Field {marker} name"), &names.join(","))
            .header(&format!("Field {marker} signed"), &signed.join(","))
            .header(&format!("Field {marker} predictor"), &predictors.join(","))
            .header(&format!("Field {marker} encoding"), &encodings.join(","))
    }

    /// Declare only the predictor and encoding of `marker`, as logs do for P
    pub fn predictors(self, marker: char, predictors: &[u32], encodings: &[u32]) -> Self {
        let list = |ids: &[u32]| {
            ids.iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        self.header(&format!("Field {marker} predictor"), &list(predictors))
            .header(&format!("Field {marker} encoding"), &list(encodings))
    }

    pub fn frame(mut self, marker: u8, body: &[u8]) -> Self {
        self.data.push(marker);
        self.data.extend_from_slice(body);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main schema with unsigned-VB iteration and time, incremented/predicted in P frames
pub fn basic_log() -> LogBuilder {
    LogBuilder::new()
        .fields('I', &[("loopIteration", false, 0, 1), ("time", false, 0, 1)])
        .predictors('P', &[6, 2], &[9, 0])
}

pub fn intra_body(iteration: u32, time: u32) -> Vec<u8> {
    let mut body = uvb(iteration);
    body.extend(uvb(time));
    body
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
