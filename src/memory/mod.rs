pub mod interface;
pub mod interrupt;
pub mod status;

/// Number of message objects the transmit request and interrupt pending
/// registers can address.
pub const MAX_MESSAGE_OBJECTS: u8 = 32;

/// A hardware message object, numbered from 1 as the controller does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageObject(u8);

impl MessageObject {
    pub const FIRST: Self = Self(1);

    /// Returns `None` for object 0 and anything past [`MAX_MESSAGE_OBJECTS`]
    pub const fn new(number: u8) -> Option<Self> {
        if number == 0 || number > MAX_MESSAGE_OBJECTS {
            None
        } else {
            Some(Self(number))
        }
    }

    /// Object number as used by the controller (1-based)
    pub const fn number(&self) -> u8 {
        self.0
    }

    /// Bit of this object in the 32 bit transmit request / interrupt pending
    /// registers
    pub const fn mask_bit(&self) -> u32 {
        1 << (self.0 - 1)
    }
}
