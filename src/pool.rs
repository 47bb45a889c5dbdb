//! Assignment of receive and transmit slots to hardware message objects.

use crate::memory::{MessageObject, MAX_MESSAGE_OBJECTS};
use crate::module::ConfigError;
use crate::settings::FilterStrategy;

/// Objects taken by the shared receive objects in software filtering
const SHARED_RX_OBJECTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterMode {
    /// Every receive slot has its own object and the controller filters
    Hardware,
    /// All receive slots share two accept-all objects, one for data and one
    /// for remote frames, filtered in software
    Software,
}

/// What a message object is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ObjectRole {
    Rx(usize),
    SharedRx,
    Tx(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObjectLayout {
    rx_len: usize,
    tx_len: usize,
    mode: FilterMode,
}

impl ObjectLayout {
    pub fn new(
        rx_len: usize,
        tx_len: usize,
        available: u8,
        strategy: FilterStrategy,
    ) -> Result<Self, ConfigError> {
        let available = available.min(MAX_MESSAGE_OBJECTS);

        if strategy == FilterStrategy::Auto && rx_len + tx_len <= usize::from(available) {
            return Ok(Self {
                rx_len,
                tx_len,
                mode: FilterMode::Hardware,
            });
        }

        let required = tx_len + SHARED_RX_OBJECTS;
        if required > usize::from(available) {
            return Err(ConfigError::TooManySlots {
                required,
                available,
            });
        }

        debug!("{} rx slots share the accept-all objects", rx_len);

        Ok(Self {
            rx_len,
            tx_len,
            mode: FilterMode::Software,
        })
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.mode
    }

    pub fn rx_len(&self) -> usize {
        self.rx_len
    }

    pub fn tx_len(&self) -> usize {
        self.tx_len
    }

    /// Dedicated object of a receive slot, `None` in software filtering
    pub fn rx_object(&self, index: usize) -> Option<MessageObject> {
        if self.mode != FilterMode::Hardware || index >= self.rx_len {
            return None;
        }

        object(index + 1)
    }

    pub fn tx_object(&self, index: usize) -> Option<MessageObject> {
        if index >= self.tx_len {
            return None;
        }

        match self.mode {
            FilterMode::Hardware => object(self.rx_len + index + 1),
            FilterMode::Software => object(index + SHARED_RX_OBJECTS + 1),
        }
    }

    /// Object receiving every data frame in software filtering
    pub fn shared_rx_object(&self) -> Option<MessageObject> {
        match self.mode {
            FilterMode::Hardware => None,
            FilterMode::Software => Some(MessageObject::FIRST),
        }
    }

    /// Object receiving every remote frame in software filtering
    pub fn shared_remote_object(&self) -> Option<MessageObject> {
        match self.mode {
            FilterMode::Hardware => None,
            FilterMode::Software => object(2),
        }
    }

    /// Inverse of the slot to object mapping
    pub fn classify(&self, object: MessageObject) -> Option<ObjectRole> {
        let number = usize::from(object.number());

        match self.mode {
            FilterMode::Hardware => {
                if number <= self.rx_len {
                    Some(ObjectRole::Rx(number - 1))
                } else if number <= self.rx_len + self.tx_len {
                    Some(ObjectRole::Tx(number - self.rx_len - 1))
                } else {
                    None
                }
            }
            FilterMode::Software => {
                if number <= SHARED_RX_OBJECTS {
                    Some(ObjectRole::SharedRx)
                } else if number - SHARED_RX_OBJECTS - 1 < self.tx_len {
                    Some(ObjectRole::Tx(number - SHARED_RX_OBJECTS - 1))
                } else {
                    None
                }
            }
        }
    }
}

fn object(number: usize) -> Option<MessageObject> {
    u8::try_from(number).ok().and_then(MessageObject::new)
}
