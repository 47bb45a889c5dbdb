use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::module::ConfigError;

/// CANopen bit rates (CiA 301), in kbit/s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum BitRate {
    Kbit10 = 10,
    Kbit20 = 20,
    Kbit50 = 50,
    Kbit125 = 125,
    #[default]
    Kbit250 = 250,
    Kbit500 = 500,
    Kbit800 = 800,
    Kbit1000 = 1000,
}

impl BitRate {
    pub fn kbit_per_second(&self) -> u16 {
        u16::from(*self)
    }
}

/// How receive slots are mapped onto message objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterStrategy {
    /// One object per slot with hardware acceptance filtering when all slots
    /// fit, shared receive objects and software filtering otherwise
    #[default]
    Auto,
    /// Always share the receive objects and filter in software
    Software,
}

/// Interrupt sources enabled on the controller's interrupt line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptConfiguration {
    pub message_objects: bool,
    pub error: bool,
    pub status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    pub bit_rate: BitRate,
    pub filter_strategy: FilterStrategy,
    pub enable_error_interrupts: bool,
    pub enable_status_interrupts: bool,
}

impl Settings {
    pub fn new(bit_rate: BitRate) -> Self {
        Self {
            bit_rate,
            filter_strategy: FilterStrategy::Auto,
            enable_error_interrupts: true,
            enable_status_interrupts: false,
        }
    }

    /// Settings for a bit rate given in kbit/s, as configured through the
    /// CANopen object dictionary or LSS
    pub fn from_kbit(kbit_per_second: u16) -> Result<Self, ConfigError> {
        Ok(Self::new(BitRate::try_from(kbit_per_second)?))
    }

    pub fn with_bit_rate(mut self, bit_rate: BitRate) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    pub fn with_filter_strategy(mut self, filter_strategy: FilterStrategy) -> Self {
        self.filter_strategy = filter_strategy;
        self
    }

    pub fn with_error_interrupts(mut self, enable_error_interrupts: bool) -> Self {
        self.enable_error_interrupts = enable_error_interrupts;
        self
    }

    pub fn with_status_interrupts(mut self, enable_status_interrupts: bool) -> Self {
        self.enable_status_interrupts = enable_status_interrupts;
        self
    }

    /// Message object interrupts are always on, receive dispatch depends on them
    pub fn interrupts(&self) -> InterruptConfiguration {
        InterruptConfiguration {
            message_objects: true,
            error: self.enable_error_interrupts,
            status: self.enable_status_interrupts,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(BitRate::default())
    }
}
