//! Reconciliation of the raw controller error counters into the sticky
//! [`ErrorStatus`] flags.

use crate::memory::status::{ErrorAndStatusRegister, ErrorCounterRegister};
use crate::status::ErrorStatus;

/// Transmit error count at which the controller goes bus off
pub const BUS_OFF_LIMIT: u16 = 256;
/// Error count at which the controller becomes error passive
pub const PASSIVE_LIMIT: u16 = 128;
/// Error count at which the warning flags are raised
pub const WARNING_LIMIT: u16 = 96;

/// The raw signals the monitor works from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorCounters {
    pub rx_errors: u16,
    pub tx_errors: u16,
    /// A receive overflow happened in the controller
    pub overflow: bool,
}

impl ErrorCounters {
    pub fn new(rx_errors: u16, tx_errors: u16, overflow: bool) -> Self {
        Self {
            rx_errors,
            tx_errors,
            overflow,
        }
    }

    /// Derives the counters from CAN_ERRC and CAN_ES. TEC stops counting at
    /// 255, so bus off is reported as [`BUS_OFF_LIMIT`]; likewise REC stops at
    /// 127 and the receive passive bit lifts it to [`PASSIVE_LIMIT`].
    pub fn from_registers(
        errc: ErrorCounterRegister,
        es: ErrorAndStatusRegister,
        overflow: bool,
    ) -> Self {
        let tx_errors = if es.boff() {
            BUS_OFF_LIMIT
        } else {
            u16::from(errc.tec())
        };

        let rx_errors = if errc.rp() {
            u16::from(errc.rec()).max(PASSIVE_LIMIT)
        } else {
            u16::from(errc.rec())
        };

        Self {
            rx_errors,
            tx_errors,
            overflow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorMonitor {
    last: ErrorCounters,
    recomputations: u32,
}

impl ErrorMonitor {
    pub const fn new() -> Self {
        Self {
            last: ErrorCounters {
                rx_errors: 0,
                tx_errors: 0,
                overflow: false,
            },
            recomputations: 0,
        }
    }

    /// Counters seen by the last recomputation
    pub fn last_counters(&self) -> ErrorCounters {
        self.last
    }

    /// How many times the flags were actually recomputed
    pub fn recomputations(&self) -> u32 {
        self.recomputations
    }

    /// Returns the new status, or `None` when the counters did not change
    /// since the last call and `status` stands as is.
    pub fn reconcile(
        &mut self,
        counters: ErrorCounters,
        status: ErrorStatus,
    ) -> Option<ErrorStatus> {
        if counters == self.last {
            return None;
        }

        self.last = counters;
        self.recomputations = self.recomputations.wrapping_add(1);

        let mut status = status;

        if counters.tx_errors >= BUS_OFF_LIMIT {
            status.set_tx_bus_off();
        } else {
            status.remove(ErrorStatus::BUS_STATE);

            if counters.rx_errors >= PASSIVE_LIMIT {
                status.set_rx_warning();
                status.set_rx_passive();
            } else if counters.rx_errors >= WARNING_LIMIT {
                status.set_rx_warning();
            }

            // Transmit warning is raised from the receive counter. Possibly a
            // defect, kept until confirmed either way.
            if counters.tx_errors >= PASSIVE_LIMIT {
                status.set_tx_warning();
                status.set_tx_passive();
            } else if counters.rx_errors >= WARNING_LIMIT {
                status.set_tx_warning();
            }

            if !status.tx_passive() {
                status.clear_tx_overflow();
            }
        }

        if counters.overflow {
            status.set_rx_overflow();
        }

        Some(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconcile(monitor: &mut ErrorMonitor, rx: u16, tx: u16, overflow: bool, status: u16) -> u16 {
        monitor
            .reconcile(ErrorCounters::new(rx, tx, overflow), ErrorStatus::from(status))
            .map(u16::from)
            .unwrap_or(status)
    }

    #[test]
    fn bus_off_regardless_of_other_counters() {
        let mut monitor = ErrorMonitor::new();

        let status = reconcile(&mut monitor, 0, 300, false, 0);
        assert_eq!(status, ErrorStatus::TX_BUS_OFF);

        let mut monitor = ErrorMonitor::new();
        let status = reconcile(&mut monitor, 200, 256, true, ErrorStatus::TX_OVERFLOW);
        assert!(ErrorStatus::from(status).tx_bus_off());
        // The else branch does not run, so the overflow is not forgiven
        assert!(ErrorStatus::from(status).tx_overflow());
        assert!(ErrorStatus::from(status).rx_overflow());
    }

    #[test]
    fn warning_and_passive_thresholds() {
        let mut monitor = ErrorMonitor::new();

        assert_eq!(reconcile(&mut monitor, 96, 0, false, 0), ErrorStatus::RX_WARNING | ErrorStatus::TX_WARNING);
        assert_eq!(
            reconcile(&mut monitor, 128, 0, false, 0),
            ErrorStatus::RX_WARNING | ErrorStatus::RX_PASSIVE | ErrorStatus::TX_WARNING
        );
        assert_eq!(
            reconcile(&mut monitor, 0, 128, false, 0),
            ErrorStatus::TX_WARNING | ErrorStatus::TX_PASSIVE
        );
        assert_eq!(reconcile(&mut monitor, 95, 127, false, 0), 0);
    }

    #[test]
    fn tx_warning_follows_receive_counter() {
        let mut monitor = ErrorMonitor::new();

        // A high transmit counter alone does not raise the transmit warning
        assert_eq!(reconcile(&mut monitor, 0, 100, false, 0), 0);
        // ...but a high receive counter does
        let status = ErrorStatus::from(reconcile(&mut monitor, 100, 0, false, 0));
        assert!(status.tx_warning());
        assert!(!status.tx_passive());
    }

    #[test]
    fn recovery_clears_bus_state_but_keeps_sticky_flags() {
        let mut monitor = ErrorMonitor::new();

        let degraded = reconcile(&mut monitor, 130, 300, true, 0);
        let degraded = degraded | ErrorStatus::TX_PDO_LATE;
        assert!(ErrorStatus::from(degraded).tx_bus_off());

        let recovered = reconcile(&mut monitor, 0, 0, false, degraded);
        let recovered = ErrorStatus::from(recovered);

        assert!(!recovered.intersects(ErrorStatus::BUS_STATE));
        assert!(recovered.rx_overflow());
        assert!(recovered.tx_pdo_late());
    }

    #[test]
    fn tx_overflow_is_forgiven_once_not_passive() {
        let mut monitor = ErrorMonitor::new();

        let status = reconcile(&mut monitor, 0, 130, false, ErrorStatus::TX_OVERFLOW);
        assert!(ErrorStatus::from(status).tx_overflow());

        let status = reconcile(&mut monitor, 0, 10, false, status);
        assert!(!ErrorStatus::from(status).tx_overflow());
    }

    #[test]
    fn unchanged_counters_are_a_no_op() {
        let mut monitor = ErrorMonitor::new();

        // Initial memo is all zero, so a quiet bus never recomputes
        assert!(monitor
            .reconcile(ErrorCounters::default(), ErrorStatus::empty())
            .is_none());
        assert_eq!(monitor.recomputations(), 0);

        let counters = ErrorCounters::new(100, 0, false);
        assert!(monitor.reconcile(counters, ErrorStatus::empty()).is_some());
        assert!(monitor.reconcile(counters, ErrorStatus::empty()).is_none());
        assert_eq!(monitor.recomputations(), 1);
        assert_eq!(monitor.last_counters(), counters);
    }

    #[test]
    fn counters_from_registers() {
        let errc = ErrorCounterRegister::from((1 << 15) | (100 << 8) | 10);
        let es = ErrorAndStatusRegister::from(0);
        assert_eq!(
            ErrorCounters::from_registers(errc, es, false),
            ErrorCounters::new(128, 10, false)
        );

        let es = ErrorAndStatusRegister::from(1 << 7);
        assert_eq!(
            ErrorCounters::from_registers(ErrorCounterRegister::from(0xFF), es, true),
            ErrorCounters::new(0, BUS_OFF_LIMIT, true)
        );
    }
}
