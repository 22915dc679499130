//! Touch report frames
//!
//! Frame format (65 bytes, fixed):
//! - COMMAND (1 byte): 0x60 for a touch report
//! - LENGTH (2 bytes, big-endian): payload length, always 62
//! - POINTS (1 byte): number of valid point records
//! - POINT RECORDS (10 × 6 bytes): id, status, x_h, x_l, y_h, y_l
//! - CHECKSUM (1 byte): XOR of every preceding byte

use heapless::Vec;

/// Command id of a touch report (also the polling fetch command)
pub const COMMAND_TP_REPORT: u8 = 0x60;

/// Command asking the MCU for whatever it has pending (interrupt path)
pub const COMMAND_QUERY: u8 = 0xFE;

/// Command id + data length + checksum
pub const TRANSPORT_OVERHEAD: usize = 3;

/// Declared payload length of a touch report
pub const REPORT_DATA_LENGTH: u16 = 62;

/// Bytes read from the MCU per fetch
pub const REPORT_SIZE: usize = REPORT_DATA_LENGTH as usize + TRANSPORT_OVERHEAD;

/// Maximum simultaneous contacts carried in one report
pub const MAX_POINTS: usize = 10;

/// Size of one point record on the wire
pub const POINT_RECORD_SIZE: usize = 6;

/// Status byte: finger went down
pub const STATUS_PRESS: u8 = 0xc0;
/// Status byte: finger lifted
pub const STATUS_RELEASE: u8 = 0xa0;
/// Status byte: finger moved
pub const STATUS_MOVE: u8 = 0x90;

const POINT_COUNT_OFFSET: usize = 3;
const POINTS_OFFSET: usize = 4;
const CHECKSUM_OFFSET: usize = REPORT_SIZE - 1;

/// XOR of all bytes, the checksum used by every MCU frame
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

/// What to do with the trailing checksum byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChecksumPolicy {
    /// Accept the frame regardless of its checksum
    #[default]
    Ignore,
    /// Reject frames whose checksum does not match
    Enforce,
}

/// Reasons a fetched frame is not forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    /// Command id is not [`COMMAND_TP_REPORT`]
    WrongCommand(u8),
    /// Declared length is not [`REPORT_DATA_LENGTH`]
    WrongLength(u16),
    /// Point count exceeds [`MAX_POINTS`]
    TooManyPoints(u8),
    /// A point references a slot outside the contact table
    SlotOutOfRange(u8),
    /// Checksum mismatch (only with [`ChecksumPolicy::Enforce`])
    BadChecksum { expected: u8, found: u8 },
}

/// Per-point contact status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PointStatus {
    Press,
    Move,
    Release,
    /// Status byte outside the documented set; treated as contact
    Unknown(u8),
}

impl PointStatus {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            STATUS_PRESS => PointStatus::Press,
            STATUS_MOVE => PointStatus::Move,
            STATUS_RELEASE => PointStatus::Release,
            other => PointStatus::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            PointStatus::Press => STATUS_PRESS,
            PointStatus::Move => STATUS_MOVE,
            PointStatus::Release => STATUS_RELEASE,
            PointStatus::Unknown(other) => other,
        }
    }

    pub fn is_release(self) -> bool {
        matches!(self, PointStatus::Release)
    }
}

/// One contact inside a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointRecord {
    /// Slot id, stable for the lifetime of a contact
    pub id: u8,
    pub status: PointStatus,
    pub x: u16,
    pub y: u16,
}

impl PointRecord {
    pub const fn new(id: u8, status: PointStatus, x: u16, y: u16) -> Self {
        Self { id, status, x, y }
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            id: bytes[0],
            status: PointStatus::from_byte(bytes[1]),
            x: u16::from_be_bytes([bytes[2], bytes[3]]),
            y: u16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }

    fn encode(&self, out: &mut [u8]) {
        let [x_h, x_l] = self.x.to_be_bytes();
        let [y_h, y_l] = self.y.to_be_bytes();
        out[..POINT_RECORD_SIZE]
            .copy_from_slice(&[self.id, self.status.to_byte(), x_h, x_l, y_h, y_l]);
    }
}

/// A frame exactly as read from the MCU
///
/// Duplicate detection compares these bytes, so nothing here normalises
/// or reorders the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawReport {
    bytes: [u8; REPORT_SIZE],
}

impl Default for RawReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RawReport {
    /// All-zero frame, ready to be filled by a bus read
    pub const fn new() -> Self {
        Self {
            bytes: [0; REPORT_SIZE],
        }
    }

    pub const fn from_bytes(bytes: [u8; REPORT_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.bytes
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8; REPORT_SIZE] {
        &mut self.bytes
    }

    pub fn command_id(&self) -> u8 {
        self.bytes[0]
    }

    /// Full 16-bit declared length
    pub fn declared_length(&self) -> u16 {
        u16::from_be_bytes([self.bytes[1], self.bytes[2]])
    }

    pub fn point_count(&self) -> u8 {
        self.bytes[POINT_COUNT_OFFSET]
    }

    pub fn checksum(&self) -> u8 {
        self.bytes[CHECKSUM_OFFSET]
    }

    /// Checksum the frame should carry
    pub fn computed_checksum(&self) -> u8 {
        xor_checksum(&self.bytes[..CHECKSUM_OFFSET])
    }

    /// Check the header, point count and (optionally) checksum
    pub fn validate(&self, policy: ChecksumPolicy) -> Result<(), ReportError> {
        if self.command_id() != COMMAND_TP_REPORT {
            return Err(ReportError::WrongCommand(self.command_id()));
        }
        if self.declared_length() != REPORT_DATA_LENGTH {
            return Err(ReportError::WrongLength(self.declared_length()));
        }
        let count = self.point_count();
        if count as usize > MAX_POINTS {
            return Err(ReportError::TooManyPoints(count));
        }
        for i in 0..count as usize {
            let id = self.bytes[POINTS_OFFSET + i * POINT_RECORD_SIZE];
            if id as usize >= MAX_POINTS {
                return Err(ReportError::SlotOutOfRange(id));
            }
        }
        if policy == ChecksumPolicy::Enforce {
            let expected = self.computed_checksum();
            if expected != self.checksum() {
                return Err(ReportError::BadChecksum {
                    expected,
                    found: self.checksum(),
                });
            }
        }
        Ok(())
    }

    /// Validate and decode the frame
    pub fn decode(&self, policy: ChecksumPolicy) -> Result<TouchReport, ReportError> {
        self.validate(policy)?;

        let mut points = Vec::new();
        for i in 0..self.point_count() as usize {
            let start = POINTS_OFFSET + i * POINT_RECORD_SIZE;
            let record = PointRecord::decode(&self.bytes[start..start + POINT_RECORD_SIZE]);
            // Count was checked against capacity above
            let _ = points.push(record);
        }

        Ok(TouchReport {
            command_id: self.command_id(),
            declared_length: self.declared_length(),
            points,
            checksum: self.checksum(),
        })
    }
}

/// A validated touch report
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchReport {
    pub command_id: u8,
    pub declared_length: u16,
    pub points: Vec<PointRecord, MAX_POINTS>,
    pub checksum: u8,
}

impl TouchReport {
    /// Build a well-formed report from a list of points
    pub fn new(points: &[PointRecord]) -> Result<Self, ReportError> {
        let mut list = Vec::new();
        list.extend_from_slice(points)
            .map_err(|_| ReportError::TooManyPoints(points.len() as u8))?;
        let mut report = Self {
            command_id: COMMAND_TP_REPORT,
            declared_length: REPORT_DATA_LENGTH,
            points: list,
            checksum: 0,
        };
        report.checksum = report.encode().computed_checksum();
        Ok(report)
    }

    /// Serialize to the wire format with a freshly computed checksum
    pub fn encode(&self) -> RawReport {
        let mut raw = RawReport::new();
        let bytes = raw.as_mut_bytes();
        bytes[0] = self.command_id;
        bytes[1..3].copy_from_slice(&self.declared_length.to_be_bytes());
        bytes[POINT_COUNT_OFFSET] = self.points.len() as u8;
        for (i, point) in self.points.iter().enumerate() {
            let start = POINTS_OFFSET + i * POINT_RECORD_SIZE;
            point.encode(&mut bytes[start..start + POINT_RECORD_SIZE]);
        }
        bytes[CHECKSUM_OFFSET] = xor_checksum(&bytes[..CHECKSUM_OFFSET]);
        raw
    }

    /// Same slots, every contact lifted at the origin
    pub fn released(&self) -> Self {
        let mut report = self.clone();
        for point in report.points.iter_mut() {
            point.status = PointStatus::Release;
            point.x = 0;
            point.y = 0;
        }
        report
    }
}
