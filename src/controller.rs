//! The hardware side of the driver.
//!
//! Implementations own the register access for one CAN peripheral. Methods
//! take `&self` because they are called from both thread and interrupt
//! context, the same way memory mapped registers are shared on the target.

use crate::memory::interface::{MessageObjectConfig, RawMessage};
use crate::memory::interrupt::InterruptRegister;
use crate::memory::status::ErrorAndStatusRegister;
use crate::memory::{MessageObject, MAX_MESSAGE_OBJECTS};
use crate::monitor::ErrorCounters;
use crate::settings::{BitRate, InterruptConfiguration};

pub trait CanController {
    /// Number of message objects the peripheral has
    const MESSAGE_OBJECT_COUNT: u8 = MAX_MESSAGE_OBJECTS;

    /// Puts the peripheral into init mode with its message RAM cleared
    fn initialize(&self);

    fn set_bit_rate(&self, bit_rate: BitRate);

    /// Invalidates every message object
    fn disable_all_message_objects(&self);

    fn setup_message_object(&self, object: MessageObject, config: &MessageObjectConfig);

    fn enable_interrupts(&self, interrupts: InterruptConfiguration);

    /// Leaves init mode and joins the bus
    fn start(&self);

    /// Enters init mode, the peripheral stops participating on the bus
    fn stop(&self);

    /// CAN_TXRQ_21: one bit per message object, see [`MessageObject::mask_bit`]
    fn transmit_requests(&self) -> u32;

    /// Loads `data` into the object and sets its transmit request
    fn send_message(&self, object: MessageObject, data: &[u8]);

    /// Clears the transmit request of the object
    fn cancel_message(&self, object: MessageObject);

    fn read_message(&self, object: MessageObject) -> RawMessage;

    fn interrupt_cause(&self) -> InterruptRegister;

    /// Reading CAN_ES also acknowledges a pending status interrupt
    fn read_status(&self) -> ErrorAndStatusRegister;

    fn clear_interrupt(&self, object: MessageObject);

    fn clear_global_interrupt(&self);

    fn error_counters(&self) -> ErrorCounters;
}
