//! Write policies and stored values of the vendor service characteristics.
//!
//! The data characteristic is server-written only, so only its CCCD
//! receives writes. The other four accept peer writes, each with its own
//! rules:
//!
//! - command: write or write-without-response, up to 20 bytes
//! - long: up to 74 bytes, with prepared writes queued until execute
//! - signed: fixed 4-byte little-endian `i32`, written in place
//! - write-command: write-without-response only

use crate::command::Command;
use crate::config::{
    PREPARE_QUEUE_DEPTH, VND_INITIAL_VALUE, VND_LONG_INITIAL_VALUE, VND_LONG_MAX_LEN, VND_MAX_LEN,
    VND_WWR_INITIAL_VALUE,
};
use crate::error::AttError;

use super::attribute::{AttValue, PrepareQueue, WriteKind};

/// Size of the signed characteristic.
pub const SIGNED_LEN: usize = 4;

/// Initial signed value.
pub const SIGNED_INITIAL: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VendorChar {
    Data,
    Command,
    Long,
    Signed,
    WriteCommand,
}

/// What an accepted write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteEffect {
    /// Value replaced; nothing else to do.
    Stored,
    /// Command characteristic updated with this content.
    Command(Command),
    /// Segment queued for a later execute.
    Queued,
    /// Queued segments applied.
    Executed,
    /// Queued segments dropped.
    Cancelled,
}

/// Characteristic a write applies to.
///
/// Execute Write requests carry no meaningful handle; the long
/// characteristic is the only one that queues, so they always go there.
pub fn write_target(by_handle: Option<VendorChar>, kind: WriteKind) -> Option<VendorChar> {
    if kind.is_execute() {
        Some(VendorChar::Long)
    } else {
        by_handle
    }
}

/// Values held by the vendor service.
pub struct VendorValues {
    command: AttValue<VND_MAX_LEN>,
    long: AttValue<VND_LONG_MAX_LEN>,
    long_queue: PrepareQueue<VND_LONG_MAX_LEN, PREPARE_QUEUE_DEPTH>,
    signed: AttValue<SIGNED_LEN>,
    write_command: AttValue<VND_MAX_LEN>,
}

impl Default for VendorValues {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorValues {
    pub fn new() -> Self {
        Self {
            command: AttValue::new(VND_INITIAL_VALUE),
            long: AttValue::new(VND_LONG_INITIAL_VALUE),
            long_queue: PrepareQueue::new(),
            signed: AttValue::new(&SIGNED_INITIAL.to_le_bytes()),
            write_command: AttValue::new(VND_WWR_INITIAL_VALUE),
        }
    }

    /// Handle one peer write.
    ///
    /// On `Err` the stored value is unchanged and the error goes back to
    /// the peer as an ATT error response.
    pub fn on_write(
        &mut self,
        target: VendorChar,
        kind: WriteKind,
        offset: usize,
        data: &[u8],
    ) -> Result<WriteEffect, AttError> {
        match target {
            VendorChar::Data => Err(AttError::WriteNotPermitted),
            VendorChar::Command => match kind {
                WriteKind::Request | WriteKind::Command | WriteKind::SignedCommand => {
                    self.command.write(offset, data)?;
                    Ok(WriteEffect::Command(Command::parse(self.command.as_bytes())))
                }
                _ => Err(AttError::WriteNotPermitted),
            },
            VendorChar::Long => match kind {
                WriteKind::PrepareRequest => {
                    self.long_queue.prepare(offset, data)?;
                    Ok(WriteEffect::Queued)
                }
                WriteKind::ExecuteRequest { commit: true } => {
                    self.long_queue.execute(&mut self.long)?;
                    Ok(WriteEffect::Executed)
                }
                WriteKind::ExecuteRequest { commit: false } => {
                    self.long_queue.cancel();
                    Ok(WriteEffect::Cancelled)
                }
                _ => {
                    self.long.write(offset, data)?;
                    Ok(WriteEffect::Stored)
                }
            },
            VendorChar::Signed => match kind {
                WriteKind::Request | WriteKind::Command | WriteKind::SignedCommand => {
                    self.signed.write_in_place(offset, data)?;
                    Ok(WriteEffect::Stored)
                }
                _ => Err(AttError::WriteNotPermitted),
            },
            VendorChar::WriteCommand => {
                if !kind.is_command() {
                    return Err(AttError::WriteRequestRejected);
                }
                self.write_command.write(offset, data)?;
                Ok(WriteEffect::Stored)
            }
        }
    }

    /// Current stored bytes of a peer-writable characteristic.
    ///
    /// The data characteristic lives in the attribute table only, so it
    /// has no copy here.
    pub fn value(&self, target: VendorChar) -> Option<&[u8]> {
        match target {
            VendorChar::Data => None,
            VendorChar::Command => Some(self.command.as_bytes()),
            VendorChar::Long => Some(self.long.as_bytes()),
            VendorChar::Signed => Some(self.signed.as_bytes()),
            VendorChar::WriteCommand => Some(self.write_command.as_bytes()),
        }
    }

    pub fn signed_value(&self) -> i32 {
        let mut b = [0u8; SIGNED_LEN];
        b.copy_from_slice(self.signed.as_bytes());
        i32::from_le_bytes(b)
    }

    /// Outstanding prepared segments for the long characteristic.
    pub fn pending_prepared(&self) -> usize {
        self.long_queue.len()
    }

    /// Drop prepared segments. Called when the link goes away.
    pub fn reset_prepared(&mut self) {
        self.long_queue.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_characteristic_rejects_peer_writes() {
        let mut v = VendorValues::new();
        assert_eq!(
            v.on_write(VendorChar::Data, WriteKind::Request, 0, b"x"),
            Err(AttError::WriteNotPermitted)
        );
    }

    #[test]
    fn command_write_is_parsed() {
        let mut v = VendorValues::new();
        let effect = v.on_write(VendorChar::Command, WriteKind::Command, 0, b"I50");
        assert_eq!(effect, Ok(WriteEffect::Command(Command::SetCurrent { microamps: 50 })));
        assert_eq!(v.value(VendorChar::Command), Some(&b"I50"[..]));
    }

    #[test]
    fn oversize_command_write_rejected_with_invalid_offset() {
        let mut v = VendorValues::new();
        let before = v.value(VendorChar::Command).map(<[u8]>::to_vec);
        assert_eq!(
            v.on_write(VendorChar::Command, WriteKind::Request, 0, &[b'9'; 25]),
            Err(AttError::InvalidOffset)
        );
        assert_eq!(v.value(VendorChar::Command).map(<[u8]>::to_vec), before);
    }

    #[test]
    fn long_characteristic_reliable_write() {
        let mut v = VendorValues::new();
        assert_eq!(
            v.on_write(VendorChar::Long, WriteKind::PrepareRequest, 0, b"first "),
            Ok(WriteEffect::Queued)
        );
        assert_eq!(
            v.on_write(VendorChar::Long, WriteKind::PrepareRequest, 6, b"second"),
            Ok(WriteEffect::Queued)
        );
        assert_eq!(v.pending_prepared(), 2);
        assert_eq!(v.value(VendorChar::Long), Some(VND_LONG_INITIAL_VALUE));

        assert_eq!(
            v.on_write(VendorChar::Long, WriteKind::ExecuteRequest { commit: true }, 0, &[]),
            Ok(WriteEffect::Executed)
        );
        assert_eq!(v.value(VendorChar::Long), Some(&b"first second"[..]));
        assert_eq!(v.pending_prepared(), 0);
    }

    #[test]
    fn decoded_prepare_and_execute_reassemble_long_value() {
        use crate::ble::attribute::op;

        let mut v = VendorValues::new();
        let prepare = WriteKind::from_op_code(op::PREP_WRITE_REQ).unwrap();
        let target = write_target(Some(VendorChar::Long), prepare).unwrap();
        assert_eq!(v.on_write(target, prepare, 20, b"abc"), Ok(WriteEffect::Queued));
        assert_eq!(v.pending_prepared(), 1);
        assert_eq!(v.value(VendorChar::Long), Some(VND_LONG_INITIAL_VALUE));

        // Execute arrives without a characteristic handle.
        let execute = WriteKind::from_op_code(op::EXEC_WRITE_REQ_NOW).unwrap();
        let target = write_target(None, execute).unwrap();
        assert_eq!(target, VendorChar::Long);
        assert_eq!(v.on_write(target, execute, 0, &[]), Ok(WriteEffect::Executed));

        let long = v.value(VendorChar::Long).unwrap();
        assert_eq!(long.len(), 23);
        assert_eq!(&long[..20], &VND_LONG_INITIAL_VALUE[..20]);
        assert_eq!(&long[20..], b"abc");
        assert_eq!(v.pending_prepared(), 0);
    }

    #[test]
    fn plain_writes_keep_their_handle_target() {
        assert_eq!(
            write_target(Some(VendorChar::Command), WriteKind::Request),
            Some(VendorChar::Command)
        );
        assert_eq!(write_target(None, WriteKind::Command), None);
    }

    #[test]
    fn long_characteristic_execute_cancel() {
        let mut v = VendorValues::new();
        v.on_write(VendorChar::Long, WriteKind::PrepareRequest, 0, b"drop me")
            .unwrap();
        assert_eq!(
            v.on_write(VendorChar::Long, WriteKind::ExecuteRequest { commit: false }, 0, &[]),
            Ok(WriteEffect::Cancelled)
        );
        assert_eq!(v.value(VendorChar::Long), Some(VND_LONG_INITIAL_VALUE));
    }

    #[test]
    fn long_characteristic_rejects_past_74_bytes() {
        let mut v = VendorValues::new();
        assert_eq!(
            v.on_write(VendorChar::Long, WriteKind::Request, 0, &[0u8; 75]),
            Err(AttError::InvalidOffset)
        );
        assert_eq!(
            v.on_write(VendorChar::Long, WriteKind::PrepareRequest, 60, &[0u8; 15]),
            Err(AttError::InvalidOffset)
        );
    }

    #[test]
    fn signed_characteristic_is_four_bytes() {
        let mut v = VendorValues::new();
        assert_eq!(v.signed_value(), SIGNED_INITIAL);
        v.on_write(VendorChar::Signed, WriteKind::SignedCommand, 0, &(-42i32).to_le_bytes())
            .unwrap();
        assert_eq!(v.signed_value(), -42);
        assert_eq!(
            v.on_write(VendorChar::Signed, WriteKind::Request, 2, &[1, 2, 3]),
            Err(AttError::InvalidOffset)
        );
        assert_eq!(v.signed_value(), -42);
    }

    #[test]
    fn write_command_characteristic_rejects_requests() {
        let mut v = VendorValues::new();
        assert_eq!(
            v.on_write(VendorChar::WriteCommand, WriteKind::Request, 0, b"abc"),
            Err(AttError::WriteRequestRejected)
        );
        assert_eq!(v.value(VendorChar::WriteCommand), Some(VND_WWR_INITIAL_VALUE));
        assert_eq!(
            v.on_write(VendorChar::WriteCommand, WriteKind::Command, 0, b"abc"),
            Ok(WriteEffect::Stored)
        );
        assert_eq!(v.value(VendorChar::WriteCommand), Some(&b"abc"[..]));
    }

    #[test]
    fn reset_prepared_clears_queue() {
        let mut v = VendorValues::new();
        v.on_write(VendorChar::Long, WriteKind::PrepareRequest, 0, b"x")
            .unwrap();
        v.reset_prepared();
        assert_eq!(v.pending_prepared(), 0);
    }
}
