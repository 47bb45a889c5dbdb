#![allow(dead_code)]

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use co_canmodule::memory::interface::{MessageObjectConfig, RawMessage};
use co_canmodule::memory::interrupt::{InterruptRegister, STATUS_INTERRUPT};
use co_canmodule::memory::status::ErrorAndStatusRegister;
use co_canmodule::memory::MessageObject;
use co_canmodule::settings::InterruptConfiguration;
use co_canmodule::{BitRate, CanController, CanFrame, ErrorCounters, RxHandler};
use embedded_can::StandardId;

pub fn id(raw: u16) -> StandardId {
    StandardId::new(raw).unwrap()
}

pub fn object(number: u8) -> MessageObject {
    MessageObject::new(number).unwrap()
}

#[derive(Debug, Default)]
pub struct MockState {
    pub initialized: usize,
    pub bit_rate: Option<BitRate>,
    pub running: bool,
    pub disabled_all: usize,
    pub objects: BTreeMap<u8, MessageObjectConfig>,
    pub interrupts: Option<InterruptConfiguration>,
    pub tx_requests: u32,
    pub sent: Vec<(u8, Vec<u8>)>,
    pub cancelled: Vec<u8>,
    /// INT0ID values, front is the highest priority pending cause
    pub pending: VecDeque<u16>,
    pub inbox: BTreeMap<u8, RawMessage>,
    pub cleared: Vec<u8>,
    pub global_clears: usize,
    pub status_reads: usize,
    pub counters: ErrorCounters,
}

/// Controller stand-in recording everything the module asks of it
#[derive(Debug, Default)]
pub struct MockController {
    state: RefCell<MockState>,
}

impl MockController {
    pub fn state(&self) -> Ref<'_, MockState> {
        self.state.borrow()
    }

    /// Latches a received frame into `object` and raises its interrupt
    pub fn receive(&self, object: u8, id: u16, data: &[u8]) {
        self.latch(object, id, false, data, false);
    }

    pub fn receive_remote(&self, object: u8, id: u16) {
        self.latch(object, id, true, &[], false);
    }

    /// Like [`MockController::receive`], with the message lost bit set
    pub fn receive_overwritten(&self, object: u8, id: u16, data: &[u8]) {
        self.latch(object, id, false, data, true);
    }

    /// Puts a frame on the bus. The lowest numbered receive object whose
    /// programmed registers accept it latches the frame; that object is
    /// returned.
    pub fn deliver(&self, id: u16, remote: bool, data: &[u8]) -> Option<u8> {
        let number = self
            .state
            .borrow()
            .objects
            .iter()
            .find(|(_, config)| accepts(config, id, remote))
            .map(|(number, _)| *number)?;

        self.latch(number, id, remote, data, false);
        Some(number)
    }

    fn latch(&self, object: u8, id: u16, remote: bool, data: &[u8], lost: bool) {
        let mut bytes = [0u8; 8];
        bytes[..data.len()].copy_from_slice(data);

        let mut arbitration = (1 << 31) | (u32::from(id) << 18);
        if remote {
            arbitration |= 1 << 29;
        }

        let mut control = (1 << 15) | data.len() as u32;
        if lost {
            control |= 1 << 14;
        }

        let raw = RawMessage::from_registers(
            arbitration,
            control,
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        );

        let mut state = self.state.borrow_mut();
        state.inbox.insert(object, raw);
        state.pending.push_back(u16::from(object));
    }

    /// The frame of `object` left the controller
    pub fn complete_transmission(&self, object: u8) {
        let mut state = self.state.borrow_mut();
        state.tx_requests &= !(1 << (object - 1));
        state.pending.push_back(u16::from(object));
    }

    /// Marks the object as busy without going through the module
    pub fn set_transmit_request(&self, object: u8) {
        self.state.borrow_mut().tx_requests |= 1 << (object - 1);
    }

    pub fn raise_status(&self) {
        self.state.borrow_mut().pending.push_back(STATUS_INTERRUPT);
    }

    pub fn raise_cause(&self, cause: u16) {
        self.state.borrow_mut().pending.push_back(cause);
    }

    pub fn set_counters(&self, rx_errors: u16, tx_errors: u16, overflow: bool) {
        self.state.borrow_mut().counters = ErrorCounters::new(rx_errors, tx_errors, overflow);
    }
}

/// Acceptance filtering as the controller does it, from the encoded registers
fn accepts(config: &MessageObjectConfig, id: u16, remote: bool) -> bool {
    if config.kind.is_transmit() {
        return false;
    }

    let arbitration = config.arbitration();
    let mask = config.mask_register();
    let control = config.control();

    let significant = if control.umask() {
        mask.std_msk()
    } else {
        0x7FF
    };

    if (!control.umask() || mask.mdir()) && arbitration.dir() != remote {
        return false;
    }

    (arbitration.std_id() ^ id) & significant == 0
}

impl CanController for MockController {
    fn initialize(&self) {
        let mut state = self.state.borrow_mut();
        state.initialized += 1;
        state.running = false;
        state.tx_requests = 0;
        state.pending.clear();
    }

    fn set_bit_rate(&self, bit_rate: BitRate) {
        self.state.borrow_mut().bit_rate = Some(bit_rate);
    }

    fn disable_all_message_objects(&self) {
        let mut state = self.state.borrow_mut();
        state.disabled_all += 1;
        state.objects.clear();
    }

    fn setup_message_object(&self, object: MessageObject, config: &MessageObjectConfig) {
        self.state
            .borrow_mut()
            .objects
            .insert(object.number(), *config);
    }

    fn enable_interrupts(&self, interrupts: InterruptConfiguration) {
        self.state.borrow_mut().interrupts = Some(interrupts);
    }

    fn start(&self) {
        self.state.borrow_mut().running = true;
    }

    fn stop(&self) {
        self.state.borrow_mut().running = false;
    }

    fn transmit_requests(&self) -> u32 {
        self.state.borrow().tx_requests
    }

    fn send_message(&self, object: MessageObject, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        state.tx_requests |= object.mask_bit();
        state.sent.push((object.number(), data.to_vec()));
    }

    fn cancel_message(&self, object: MessageObject) {
        let mut state = self.state.borrow_mut();
        state.tx_requests &= !object.mask_bit();
        state.cancelled.push(object.number());
    }

    fn read_message(&self, object: MessageObject) -> RawMessage {
        self.state
            .borrow()
            .inbox
            .get(&object.number())
            .copied()
            .unwrap_or_default()
    }

    fn interrupt_cause(&self) -> InterruptRegister {
        let cause = self.state.borrow().pending.front().copied().unwrap_or(0);
        InterruptRegister::from(u32::from(cause))
    }

    fn read_status(&self) -> ErrorAndStatusRegister {
        let mut state = self.state.borrow_mut();
        state.status_reads += 1;
        if state.pending.front() == Some(&STATUS_INTERRUPT) {
            state.pending.pop_front();
        }
        ErrorAndStatusRegister::from(0)
    }

    fn clear_interrupt(&self, object: MessageObject) {
        let mut state = self.state.borrow_mut();
        let cause = u16::from(object.number());

        if let Some(position) = state.pending.iter().position(|&pending| pending == cause) {
            state.pending.remove(position);
        }
        state.cleared.push(object.number());
    }

    fn clear_global_interrupt(&self) {
        self.state.borrow_mut().global_clears += 1;
    }

    fn error_counters(&self) -> ErrorCounters {
        self.state.borrow().counters
    }
}

/// Receive handler keeping every frame it is given
#[derive(Debug, Default)]
pub struct Recorder {
    frames: Mutex<Vec<CanFrame>>,
}

impl Recorder {
    pub fn frames(&self) -> Vec<CanFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl RxHandler for Recorder {
    fn on_receive(&self, frame: &CanFrame) {
        self.frames.lock().unwrap().push(*frame);
    }
}
