use bitfield::bitfield;

use crate::impl_to_from_u32;

use super::MessageObject;

/// INT0ID value signalling an error or status change
pub const STATUS_INTERRUPT: u16 = 0x8000;

bitfield! {
    /// CAN_INT, holds the highest priority pending cause per interrupt line
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterruptRegister(u32);
    impl Debug;
    u16;
    pub int0id, _: 15, 0;
    pub u8, int1id, _: 23, 16;
}

impl_to_from_u32!(InterruptRegister);

impl InterruptRegister {
    /// Cause pending on interrupt line 0, the only line the driver uses
    pub fn cause(&self) -> InterruptCause {
        InterruptCause::from(self.int0id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptCause {
    NoInterrupt,
    /// Error or status change, acknowledged by reading CAN_ES
    Status,
    /// A message object finished a reception or a transmission
    MessageObject(MessageObject),
    Reserved(u16),
}

impl From<u16> for InterruptCause {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => Self::NoInterrupt,
            STATUS_INTERRUPT => Self::Status,
            _ => match u8::try_from(value).ok().and_then(MessageObject::new) {
                Some(object) => Self::MessageObject(object),
                None => Self::Reserved(value),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_interrupt_causes() {
        assert_eq!(InterruptCause::from(0), InterruptCause::NoInterrupt);
        assert_eq!(InterruptCause::from(0x8000), InterruptCause::Status);
        assert_eq!(
            InterruptCause::from(1),
            InterruptCause::MessageObject(MessageObject::FIRST)
        );
        assert_eq!(
            InterruptCause::from(32),
            InterruptCause::MessageObject(MessageObject::new(32).unwrap())
        );
        assert_eq!(InterruptCause::from(33), InterruptCause::Reserved(33));
        assert_eq!(InterruptCause::from(0x1234), InterruptCause::Reserved(0x1234));
    }

    #[test]
    fn reads_line_zero_from_register() {
        let register = InterruptRegister::from(0x0005_0003);

        assert_eq!(register.int1id(), 5);
        assert_eq!(
            register.cause(),
            InterruptCause::MessageObject(MessageObject::new(3).unwrap())
        );
    }
}
