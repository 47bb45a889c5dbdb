use arbitrary_int::u4;
use embedded_can::StandardId;

use super::{len_for_dlc, MAX_DATA_LEN};

/// Addressing of a transmit slot, fixed when the slot is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxConfig {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub id: StandardId,
    pub remote: bool,
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub dlc: u4,
    /// Frame belongs to a SYNC cycle and must be dropped rather than sent late
    pub sync: bool,
}

impl TxConfig {
    pub fn data_len(&self) -> usize {
        if self.remote {
            0
        } else {
            len_for_dlc(self.dlc)
        }
    }
}

/// Handle to a configured transmit slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxSlotRef(usize);

impl TxSlotRef {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxSlot {
    config: Option<TxConfig>,
    payload: [u8; MAX_DATA_LEN],
    full: bool,
}

impl TxSlot {
    pub const EMPTY: Self = Self {
        config: None,
        payload: [0u8; MAX_DATA_LEN],
        full: false,
    };

    pub(crate) fn configure(&mut self, config: TxConfig) {
        self.config = Some(config);
        self.payload = [0u8; MAX_DATA_LEN];
        self.full = false;
    }

    pub fn config(&self) -> Option<&TxConfig> {
        self.config.as_ref()
    }

    /// A full slot owns its message object until the transmission completes
    /// or is cancelled
    pub fn is_full(&self) -> bool {
        self.full
    }

    pub(crate) fn set_full(&mut self, full: bool) {
        self.full = full;
    }

    pub fn is_sync(&self) -> bool {
        self.config.is_some_and(|config| config.sync)
    }

    /// The bytes that go on the bus, as many as the configured DLC allows
    pub fn payload(&self) -> &[u8] {
        let len = self.config.map_or(0, |config| config.data_len());

        &self.payload[..len]
    }

    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.config.map_or(0, |config| config.data_len());

        &mut self.payload[..len]
    }
}

impl Default for TxSlot {
    fn default() -> Self {
        Self::EMPTY
    }
}
