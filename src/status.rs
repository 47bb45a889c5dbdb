//! Sticky CAN error status, bit compatible with the CANopenNode
//! `CO_CAN_ERR_status_t` flags so the emergency layer can consume it as is.

use bitfield::bitfield;

use crate::{impl_to_from_u16, status_flag};

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct ErrorStatus(u16);
    impl Debug;
    _tx_warning, _set_tx_warning: 0;
    _tx_passive, _set_tx_passive: 1;
    _tx_bus_off, _set_tx_bus_off: 2;
    _tx_overflow, _set_tx_overflow: 3;
    _tx_pdo_late, _set_tx_pdo_late: 7;
    _rx_warning, _set_rx_warning: 8;
    _rx_passive, _set_rx_passive: 9;
    _rx_overflow, _set_rx_overflow: 11;
}

impl_to_from_u16!(ErrorStatus);

impl ErrorStatus {
    pub const TX_WARNING: u16 = 0x0001;
    pub const TX_PASSIVE: u16 = 0x0002;
    pub const TX_BUS_OFF: u16 = 0x0004;
    pub const TX_OVERFLOW: u16 = 0x0008;
    pub const TX_PDO_LATE: u16 = 0x0080;
    pub const RX_WARNING: u16 = 0x0100;
    pub const RX_PASSIVE: u16 = 0x0200;
    pub const RX_OVERFLOW: u16 = 0x0800;
    /// Any warning or passive flag, rx or tx
    pub const WARNING_OR_PASSIVE: u16 = 0x0303;

    /// Flags recomputed from the error counters on every reconciliation
    pub const BUS_STATE: u16 = Self::TX_BUS_OFF
        | Self::RX_WARNING
        | Self::RX_PASSIVE
        | Self::TX_WARNING
        | Self::TX_PASSIVE;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, flags: u16) -> bool {
        self.0 & flags == flags
    }

    pub fn intersects(&self, flags: u16) -> bool {
        self.0 & flags != 0
    }

    pub fn insert(&mut self, flags: u16) {
        self.0 |= flags;
    }

    pub fn remove(&mut self, flags: u16) {
        self.0 &= !flags;
    }

    pub fn is_warning_or_passive(&self) -> bool {
        self.intersects(Self::WARNING_OR_PASSIVE)
    }

    status_flag!(tx_warning, set_tx_warning, clear_tx_warning);
    status_flag!(tx_passive, set_tx_passive, clear_tx_passive);
    status_flag!(tx_bus_off, set_tx_bus_off, clear_tx_bus_off);
    status_flag!(tx_overflow, set_tx_overflow, clear_tx_overflow);
    status_flag!(tx_pdo_late, set_tx_pdo_late, clear_tx_pdo_late);
    status_flag!(rx_warning, set_rx_warning, clear_rx_warning);
    status_flag!(rx_passive, set_rx_passive, clear_rx_passive);
    status_flag!(rx_overflow, set_rx_overflow, clear_rx_overflow);
}

#[cfg(feature = "defmt")]
impl defmt::Format for ErrorStatus {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ErrorStatus({=u16:#06x})", self.0)
    }
}
