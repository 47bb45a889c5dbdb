use bitfield::bitfield;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::impl_to_from_u32;

/// Type of the last error detected on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LastErrorCode {
    NoError = 0,
    StuffError = 1,
    FormError = 2,
    AckError = 3,
    Bit1Error = 4,
    Bit0Error = 5,
    CrcError = 6,
    NoChange = 7,
}

bitfield! {
    /// CAN_ES. Reading it acknowledges a pending status interrupt.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct ErrorAndStatusRegister(u32);
    impl Debug;
    u8;
    _lec, _: 2, 0;
    /// A message was transmitted successfully since the last read
    pub tx_ok, _: 3;
    /// A message was received successfully since the last read
    pub rx_ok, _: 4;
    /// Error passive
    pub epass, _: 5;
    /// Warning level (96) reached by one of the error counters
    pub ewarn, _: 6;
    /// Bus off
    pub boff, _: 7;
    /// Parity error in message RAM
    pub per, _: 8;
}

impl_to_from_u32!(ErrorAndStatusRegister);

impl ErrorAndStatusRegister {
    pub fn lec(&self) -> LastErrorCode {
        match LastErrorCode::try_from(self._lec()) {
            Ok(code) => code,
            Err(_) => LastErrorCode::NoChange,
        }
    }
}

bitfield! {
    /// CAN_ERRC
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct ErrorCounterRegister(u32);
    impl Debug;
    u8;
    /// Transmit error counter
    pub tec, _: 7, 0;
    /// Receive error counter
    pub rec, _: 14, 8;
    /// Receive error passive (REC reached 128)
    pub rp, _: 15;
}

impl_to_from_u32!(ErrorCounterRegister);
