use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::{CriticalSection, Mutex};
use embedded_can::StandardId;
use num_enum::TryFromPrimitiveError;

use crate::controller::CanController;
use crate::memory::interface::MessageObjectConfig;
use crate::memory::interrupt::InterruptCause;
use crate::memory::MessageObject;
use crate::message::rx::{RxFilter, RxHandlerRef, RxSlot};
use crate::message::tx::{TxConfig, TxSlot, TxSlotRef};
use crate::message::{dlc_for_len, CanFrame, MAX_DATA_LEN};
use crate::monitor::ErrorMonitor;
use crate::pool::{FilterMode, ObjectLayout, ObjectRole};
use crate::settings::{BitRate, Settings};
use crate::status::ErrorStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The previous frame of the slot is still waiting for the bus
    TxOverflow,
    /// Handle does not refer to a transmit slot of this module
    InvalidSlot(usize),
    /// Transmit slot was never configured
    SlotNotConfigured(usize),
    /// More bytes than the configured DLC of the slot
    PayloadTooLong(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    SlotOutOfRange(usize),
    /// Classic CAN carries at most 8 data bytes
    InvalidLength(u8),
    UnsupportedBitRate(u16),
    /// Not even the transmit slots and the shared receive objects fit
    TooManySlots { required: usize, available: u8 },
}

impl From<TryFromPrimitiveError<BitRate>> for ConfigError {
    fn from(error: TryFromPrimitiveError<BitRate>) -> Self {
        ConfigError::UnsupportedBitRate(error.number)
    }
}

struct TxPath<'a> {
    slots: &'a mut [TxSlot],
    /// Last frame handed to the controller belongs to a SYNC cycle
    buffer_inhibit: bool,
    /// No transmission has completed since bring-up
    first_transmit_pending: bool,
}

/// CAN module of one controller: transmit and receive slots mapped onto the
/// controller's message objects, plus the sticky bus error status.
///
/// All methods take `&self`, the module is meant to live in a `static` shared
/// by the application and the CAN interrupt, which calls
/// [`CanModule::on_interrupt`].
pub struct CanModule<'a, C> {
    controller: C,
    settings: Settings,
    layout: ObjectLayout,
    normal_mode: AtomicBool,
    rx: Mutex<RefCell<&'a mut [RxSlot<'a>]>>,
    tx: Mutex<RefCell<TxPath<'a>>>,
    error_status: Mutex<Cell<ErrorStatus>>,
    monitor: Mutex<Cell<ErrorMonitor>>,
}

impl<'a, C> CanModule<'a, C>
where
    C: CanController,
{
    /// Takes over the controller and brings it up in configuration mode. The
    /// slot tables are reset, their length decides the object layout.
    pub fn new(
        controller: C,
        rx: &'a mut [RxSlot<'a>],
        tx: &'a mut [TxSlot],
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        let layout = ObjectLayout::new(
            rx.len(),
            tx.len(),
            C::MESSAGE_OBJECT_COUNT,
            settings.filter_strategy,
        )?;

        let module = Self {
            controller,
            settings,
            layout,
            normal_mode: AtomicBool::new(false),
            rx: Mutex::new(RefCell::new(rx)),
            tx: Mutex::new(RefCell::new(TxPath {
                slots: tx,
                buffer_inhibit: false,
                first_transmit_pending: true,
            })),
            error_status: Mutex::new(Cell::new(ErrorStatus::empty())),
            monitor: Mutex::new(Cell::new(ErrorMonitor::new())),
        };

        module.bring_up();

        Ok(module)
    }

    /// Releases ownership of the controller
    pub fn free(self) -> C {
        self.controller
    }

    /// Re-runs the bring-up done by [`CanModule::new`]: all slots are
    /// unconfigured again and the error state is cleared.
    pub fn reset(&self) {
        self.bring_up();
    }

    fn bring_up(&self) {
        self.normal_mode.store(false, Ordering::Release);

        self.controller.initialize();
        self.controller.set_bit_rate(self.settings.bit_rate);
        self.controller.disable_all_message_objects();

        critical_section::with(|cs| {
            for slot in self.rx.borrow_ref_mut(cs).iter_mut() {
                *slot = RxSlot::EMPTY;
            }

            let mut tx = self.tx.borrow_ref_mut(cs);
            for slot in tx.slots.iter_mut() {
                *slot = TxSlot::EMPTY;
            }
            tx.buffer_inhibit = false;
            tx.first_transmit_pending = true;

            self.error_status.borrow(cs).set(ErrorStatus::empty());
            self.monitor.borrow(cs).set(ErrorMonitor::new());
        });

        if let Some(object) = self.layout.shared_rx_object() {
            self.controller
                .setup_message_object(object, &MessageObjectConfig::accept_all());
        }
        if let Some(object) = self.layout.shared_remote_object() {
            self.controller
                .setup_message_object(object, &MessageObjectConfig::accept_all_remote());
        }

        self.controller.enable_interrupts(self.settings.interrupts());

        info!(
            "CAN module up at {} kbit/s, {} rx / {} tx slots",
            self.settings.bit_rate.kbit_per_second(),
            self.layout.rx_len(),
            self.layout.tx_len()
        );
    }

    /// Takes the controller off the bus. Frames still waiting in transmit
    /// objects are cancelled, slot configuration is kept.
    pub fn enter_configuration_mode(&self) {
        self.controller.stop();
        self.normal_mode.store(false, Ordering::Release);

        let abandoned = critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            let mut abandoned = 0usize;

            for (index, slot) in tx.slots.iter_mut().enumerate() {
                if slot.is_full() {
                    if let Some(object) = self.layout.tx_object(index) {
                        self.controller.cancel_message(object);
                    }
                    slot.set_full(false);
                    abandoned += 1;
                }
            }
            tx.buffer_inhibit = false;

            abandoned
        });

        if abandoned > 0 {
            debug!("abandoned {} pending transmissions", abandoned);
        }
    }

    pub fn enter_normal_mode(&self) {
        self.controller.start();
        self.normal_mode.store(true, Ordering::Release);
    }

    /// Stops the controller without touching any slot
    pub fn disable(&self) {
        self.controller.stop();
        self.normal_mode.store(false, Ordering::Release);
    }

    pub fn is_normal_mode(&self) -> bool {
        self.normal_mode.load(Ordering::Acquire)
    }

    /// Routes frames matching `id`/`mask` (and `remote`) to `handler`.
    ///
    /// `mask` bits set to 1 must match, 0 bits are don't care. The remote flag
    /// always has to match.
    pub fn configure_rx_slot(
        &self,
        index: usize,
        id: StandardId,
        mask: StandardId,
        remote: bool,
        handler: RxHandlerRef<'a>,
    ) -> Result<(), ConfigError> {
        if index >= self.layout.rx_len() {
            return Err(ConfigError::SlotOutOfRange(index));
        }

        let filter = RxFilter::new(id, mask, remote);

        critical_section::with(|cs| {
            self.rx.borrow_ref_mut(cs)[index].configure(filter, handler);
        });

        if let Some(object) = self.layout.rx_object(index) {
            self.controller
                .setup_message_object(object, &MessageObjectConfig::receive(id, mask, remote));
        }

        Ok(())
    }

    /// Sets up a transmit slot for frames with the given identifier and
    /// `length` data bytes. An outstanding transmission of the slot is
    /// cancelled and its payload zeroed.
    pub fn configure_tx_slot(
        &self,
        index: usize,
        id: StandardId,
        remote: bool,
        length: u8,
        sync: bool,
    ) -> Result<TxSlotRef, ConfigError> {
        let object = self
            .layout
            .tx_object(index)
            .ok_or(ConfigError::SlotOutOfRange(index))?;

        let dlc = dlc_for_len(usize::from(length)).ok_or(ConfigError::InvalidLength(length))?;

        let config = TxConfig {
            id,
            remote,
            dlc,
            sync,
        };

        critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            let slot = &mut tx.slots[index];

            if slot.is_full() {
                self.controller.cancel_message(object);
            }
            slot.configure(config);
        });

        self.controller
            .setup_message_object(object, &MessageObjectConfig::transmit(id, remote, dlc));

        Ok(TxSlotRef::new(index))
    }

    /// Copies `data` to the start of the slot's payload
    pub fn set_payload(&self, slot: TxSlotRef, data: &[u8]) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            let payload = configured_slot(&mut tx.slots, slot)?.payload_mut();

            if data.len() > payload.len() {
                return Err(Error::PayloadTooLong(data.len()));
            }

            payload[..data.len()].copy_from_slice(data);
            Ok(())
        })
    }

    /// Gives `f` a copy of the slot's payload, sized to its DLC, and stores
    /// it back once `f` returns.
    ///
    /// `f` runs outside the module's critical section and may call back into
    /// the module. Payload writes made to the same slot from inside `f` are
    /// overwritten by the copy. If the slot is reconfigured meanwhile the copy
    /// is dropped and [`Error::SlotNotConfigured`] returned.
    pub fn with_payload<R>(
        &self,
        slot: TxSlotRef,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, Error> {
        let (config, mut buffer, len) = critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            let entry = configured_slot(&mut tx.slots, slot)?;
            let payload = entry.payload();

            let mut buffer = [0u8; MAX_DATA_LEN];
            buffer[..payload.len()].copy_from_slice(payload);

            Ok((entry.config().copied(), buffer, payload.len()))
        })?;

        let result = f(&mut buffer[..len]);

        critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            let entry = configured_slot(&mut tx.slots, slot)?;

            if entry.config().copied() != config {
                return Err(Error::SlotNotConfigured(slot.index()));
            }

            entry.payload_mut().copy_from_slice(&buffer[..len]);
            Ok(())
        })?;

        Ok(result)
    }

    /// Hands the slot's frame to the controller. Never waits: if the previous
    /// frame of the slot has not left yet, [`Error::TxOverflow`] is returned
    /// and the overflow is recorded in [`CanModule::error_status`].
    pub fn send(&self, slot: TxSlotRef) -> Result<(), Error> {
        let object = self
            .layout
            .tx_object(slot.index())
            .ok_or(Error::InvalidSlot(slot.index()))?;

        critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            let first_transmit_pending = tx.first_transmit_pending;
            let entry = configured_slot(&mut tx.slots, slot)?;

            if entry.is_full() || self.controller.transmit_requests() & object.mask_bit() != 0 {
                // Right after bring-up the objects may still be busy from
                // before, that is not an overflow.
                if !first_transmit_pending {
                    self.raise(cs, ErrorStatus::TX_OVERFLOW);
                }

                trace!("tx slot {} busy", slot.index());
                return Err(Error::TxOverflow);
            }

            self.controller.send_message(object, entry.payload());
            entry.set_full(true);
            let sync = entry.is_sync();

            tx.buffer_inhibit = sync;

            Ok(())
        })
    }

    /// Drops every SYNC frame still waiting for the bus and returns how many
    /// were dropped. Any drop raises the PDO late flag.
    pub fn clear_pending_sync_frames(&self) -> usize {
        let purged = critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            let mut purged = 0usize;

            for (index, slot) in tx.slots.iter_mut().enumerate() {
                if slot.is_full() && slot.is_sync() {
                    if let Some(object) = self.layout.tx_object(index) {
                        self.controller.cancel_message(object);
                    }
                    slot.set_full(false);
                    purged += 1;
                }
            }

            if purged > 0 {
                self.raise(cs, ErrorStatus::TX_PDO_LATE);
            }

            purged
        });

        if purged > 0 {
            debug!("dropped {} late sync frames", purged);
        }

        purged
    }

    /// Interrupt entry point: drains every pending cause of the controller.
    pub fn on_interrupt(&self) {
        if !self.is_normal_mode() {
            self.controller.clear_global_interrupt();
            return;
        }

        // Every object can be pending at most once, plus one status cause
        for _ in 0..=usize::from(C::MESSAGE_OBJECT_COUNT) {
            match self.controller.interrupt_cause().cause() {
                InterruptCause::NoInterrupt => break,
                InterruptCause::Status => {
                    let status = self.controller.read_status();
                    if status.boff() {
                        warn!("controller is bus off");
                    }
                    trace!("status interrupt, CAN_ES {:#x}", u32::from(status));
                }
                InterruptCause::MessageObject(object) => {
                    match self.layout.classify(object) {
                        Some(ObjectRole::Tx(index)) => self.transmit_complete(index),
                        Some(role) => self.receive(object, role),
                        None => trace!("interrupt on unused object {}", object.number()),
                    }
                    self.controller.clear_interrupt(object);
                }
                InterruptCause::Reserved(cause) => {
                    warn!("unknown interrupt cause {:#x}", cause);
                    break;
                }
            }
        }

        self.controller.clear_global_interrupt();
    }

    fn receive(&self, object: MessageObject, role: ObjectRole) {
        let raw = self.controller.read_message(object);
        let frame = CanFrame::from_raw(&raw);

        let handler = critical_section::with(|cs| {
            if raw.message_lost() {
                self.raise(cs, ErrorStatus::RX_OVERFLOW);
            }

            let rx = self.rx.borrow_ref(cs);
            match role {
                ObjectRole::Rx(index) => rx.get(index).and_then(RxSlot::handler),
                _ => rx
                    .iter()
                    .find(|slot| slot.accepts(&frame))
                    .and_then(RxSlot::handler),
            }
        });

        match handler {
            Some(handler) => handler.on_receive(&frame),
            None => trace!("no rx slot for key {:#x}", frame.filter_key()),
        }
    }

    fn transmit_complete(&self, index: usize) {
        critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);

            if let Some(slot) = tx.slots.get_mut(index) {
                slot.set_full(false);
            }
            tx.buffer_inhibit = false;
            tx.first_transmit_pending = false;
        });
    }

    /// Folds the controller's error counters into the error status. Meant to
    /// be called periodically from the main loop.
    pub fn reconcile(&self) -> ErrorStatus {
        let counters = self.controller.error_counters();

        critical_section::with(|cs| {
            let status = self.error_status.borrow(cs);
            let monitor = self.monitor.borrow(cs);

            let mut memo = monitor.get();
            if let Some(updated) = memo.reconcile(counters, status.get()) {
                monitor.set(memo);
                status.set(updated);

                debug!(
                    "CAN errors rx {} tx {}, status {:#x}",
                    counters.rx_errors,
                    counters.tx_errors,
                    updated.bits()
                );
            }

            status.get()
        })
    }

    fn raise(&self, cs: CriticalSection, flags: u16) {
        let status = self.error_status.borrow(cs);
        let mut value = status.get();

        value.insert(flags);
        status.set(value);
    }

    pub fn error_status(&self) -> ErrorStatus {
        critical_section::with(|cs| self.error_status.borrow(cs).get())
    }

    pub fn is_first_transmit_pending(&self) -> bool {
        critical_section::with(|cs| self.tx.borrow_ref(cs).first_transmit_pending)
    }

    /// Set while the last frame handed to the controller is a SYNC frame
    pub fn is_buffer_inhibited(&self) -> bool {
        critical_section::with(|cs| self.tx.borrow_ref(cs).buffer_inhibit)
    }

    pub fn is_tx_full(&self, slot: TxSlotRef) -> bool {
        self.tx_slot(slot).is_some_and(|slot| slot.is_full())
    }

    /// Snapshot of a transmit slot
    pub fn tx_slot(&self, slot: TxSlotRef) -> Option<TxSlot> {
        critical_section::with(|cs| self.tx.borrow_ref(cs).slots.get(slot.index()).copied())
    }

    /// Filter of a configured receive slot
    pub fn rx_filter(&self, index: usize) -> Option<RxFilter> {
        critical_section::with(|cs| {
            self.rx
                .borrow_ref(cs)
                .get(index)
                .filter(|slot| slot.is_configured())
                .map(|slot| *slot.filter())
        })
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.layout.filter_mode()
    }

    pub fn layout(&self) -> &ObjectLayout {
        &self.layout
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn monitor(&self) -> ErrorMonitor {
        critical_section::with(|cs| self.monitor.borrow(cs).get())
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }
}

fn configured_slot(slots: &mut [TxSlot], slot: TxSlotRef) -> Result<&mut TxSlot, Error> {
    let index = slot.index();
    let entry = slots.get_mut(index).ok_or(Error::InvalidSlot(index))?;

    if entry.config().is_none() {
        return Err(Error::SlotNotConfigured(index));
    }

    Ok(entry)
}
