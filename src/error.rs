//! Unified error types for the sensor firmware.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` when the `defmt` feature is on.

/// Top-level error type used across the application.
///
/// Setup failures, plus the few runtime operations that report through
/// `Result` (attribute updates, settings flash). The sampling loop never
/// returns one: transient problems end up in `SampleReport` or
/// `PublishOutcome` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // ADC
    /// SAADC calibration or first conversion did not complete.
    AdcNotReady,

    // BLE
    /// The SoftDevice returned a BLE-level error.
    Ble(BleError),

    /// A service or characteristic could not be added to the attribute table.
    GattRegistration,

    // Storage
    /// Settings flash read or write failed.
    Storage,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// Local attribute value could not be updated.
    SetValueFailed,
}

/// ATT protocol errors returned to the peer for one rejected write.
///
/// The connection stays up; only the offending operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttError {
    /// `offset + len` runs past the attribute capacity.
    InvalidOffset,
    /// The attribute does not accept this kind of write.
    WriteNotPermitted,
    /// Acknowledged write sent to a command-only attribute.
    WriteRequestRejected,
    /// Reassembled value does not fit the attribute.
    InvalidAttributeValueLength,
    /// Too many queued prepare-write segments.
    PrepareQueueFull,
}

impl AttError {
    /// Bluetooth Core ATT error code sent on the wire.
    pub const fn code(self) -> u8 {
        match self {
            AttError::WriteNotPermitted => 0x03,
            AttError::InvalidOffset => 0x07,
            AttError::PrepareQueueFull => 0x09,
            AttError::InvalidAttributeValueLength => 0x0D,
            // Common profile error range.
            AttError::WriteRequestRejected => 0xFC,
        }
    }
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}
