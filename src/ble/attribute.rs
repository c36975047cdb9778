//! Bounded attribute values and prepared-write reassembly.

use heapless::Vec;

use crate::error::AttError;

/// How the peer wrote to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteKind {
    /// Write Request (acknowledged).
    Request,
    /// Write Command (no response).
    Command,
    /// Signed Write Command.
    SignedCommand,
    /// Prepare Write Request, queued until execute.
    PrepareRequest,
    /// Execute Write Request. `commit == false` cancels the queue.
    ExecuteRequest { commit: bool },
}

/// GATTS write operation codes as reported by the SoftDevice
/// (`BLE_GATTS_OP_*`).
pub mod op {
    pub const INVALID: u8 = 0x00;
    pub const WRITE_REQ: u8 = 0x01;
    pub const WRITE_CMD: u8 = 0x02;
    pub const SIGN_WRITE_CMD: u8 = 0x03;
    pub const PREP_WRITE_REQ: u8 = 0x04;
    pub const EXEC_WRITE_REQ_CANCEL: u8 = 0x05;
    pub const EXEC_WRITE_REQ_NOW: u8 = 0x06;
}

impl WriteKind {
    /// Decode a GATTS write operation code. `None` for `INVALID` and
    /// unknown codes.
    pub fn from_op_code(code: u8) -> Option<Self> {
        match code {
            op::WRITE_REQ => Some(WriteKind::Request),
            op::WRITE_CMD => Some(WriteKind::Command),
            op::SIGN_WRITE_CMD => Some(WriteKind::SignedCommand),
            op::PREP_WRITE_REQ => Some(WriteKind::PrepareRequest),
            op::EXEC_WRITE_REQ_CANCEL => Some(WriteKind::ExecuteRequest { commit: false }),
            op::EXEC_WRITE_REQ_NOW => Some(WriteKind::ExecuteRequest { commit: true }),
            _ => None,
        }
    }

    /// Write without response, signed or not.
    pub fn is_command(self) -> bool {
        matches!(self, WriteKind::Command | WriteKind::SignedCommand)
    }

    pub fn is_execute(self) -> bool {
        matches!(self, WriteKind::ExecuteRequest { .. })
    }
}

/// Fixed-capacity attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttValue<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> AttValue<N> {
    /// Initial contents are cut to capacity.
    pub fn new(initial: &[u8]) -> Self {
        let mut v = Self {
            buf: [0; N],
            len: 0,
        };
        let n = initial.len().min(N);
        v.buf[..n].copy_from_slice(&initial[..n]);
        v.len = n;
        v
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Write `data` at `offset` and end the value right after it.
    ///
    /// Rejects with `InvalidOffset` when `offset + data.len()` exceeds the
    /// capacity; the stored value is left untouched.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), AttError> {
        let end = Self::end_of(offset, data)?;
        self.buf[offset..end].copy_from_slice(data);
        self.len = end;
        Ok(())
    }

    /// Overwrite `data` at `offset` keeping any bytes past it.
    pub fn write_in_place(&mut self, offset: usize, data: &[u8]) -> Result<(), AttError> {
        let end = Self::end_of(offset, data)?;
        self.buf[offset..end].copy_from_slice(data);
        self.len = self.len.max(end);
        Ok(())
    }

    fn end_of(offset: usize, data: &[u8]) -> Result<usize, AttError> {
        match offset.checked_add(data.len()) {
            Some(end) if end <= N => Ok(end),
            _ => Err(AttError::InvalidOffset),
        }
    }
}

/// One queued prepare-write segment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment<const N: usize> {
    offset: usize,
    data: Vec<u8, N>,
}

/// Queue of prepare-write segments for a value of capacity `N`.
///
/// Segments are validated when queued and applied in arrival order on
/// execute. Execution is all-or-nothing.
#[derive(Debug, Default)]
pub struct PrepareQueue<const N: usize, const DEPTH: usize> {
    segments: Vec<Segment<N>, DEPTH>,
}

impl<const N: usize, const DEPTH: usize> PrepareQueue<N, DEPTH> {
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn prepare(&mut self, offset: usize, data: &[u8]) -> Result<(), AttError> {
        match offset.checked_add(data.len()) {
            Some(end) if end <= N => {}
            _ => return Err(AttError::InvalidOffset),
        }
        let data = Vec::from_slice(data).map_err(|_| AttError::InvalidAttributeValueLength)?;
        self.segments
            .push(Segment { offset, data })
            .map_err(|_| AttError::PrepareQueueFull)
    }

    /// Apply every queued segment to `value`, or none of them.
    ///
    /// The queue is emptied either way.
    pub fn execute(&mut self, value: &mut AttValue<N>) -> Result<(), AttError> {
        let mut staged = value.clone();
        let mut result = Ok(());
        for seg in &self.segments {
            if let Err(e) = staged.write(seg.offset, &seg.data) {
                result = Err(e);
                break;
            }
        }
        self.segments.clear();
        result.map(|()| *value = staged)
    }

    pub fn cancel(&mut self) {
        self.segments.clear();
    }
}
