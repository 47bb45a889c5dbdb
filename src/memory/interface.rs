//! Message object interface registers (IFxARB, IFxMSK, IFxMCTL, IFxDATA/B).
//!
//! The controller never exposes message RAM directly: an object is copied
//! into the interface registers first and read from there. These layouts are
//! the only place where identifier, direction and DLC exist in packed form.

use arbitrary_int::u4;
use bitfield::bitfield;
use embedded_can::StandardId;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::impl_to_from_u32;
use crate::message::MAX_DATA_LEN;

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct ArbitrationRegister(u32);
    impl Debug;
    u32;
    /// Full 29 bit identifier field
    pub id, set_id: 28, 0;
    /// Standard identifier, aligned to the top of the ID field
    pub u16, std_id, set_std_id: 28, 18;
    /// Message direction (set = transmit)
    pub dir, set_dir: 29;
    /// Extended identifier
    pub xtd, set_xtd: 30;
    /// Message valid
    pub msgval, set_msgval: 31;
}

impl_to_from_u32!(ArbitrationRegister);

impl ArbitrationRegister {
    pub fn identifier(&self) -> StandardId {
        StandardId::new(self.std_id() & StandardId::MAX.as_raw()).unwrap_or(StandardId::MAX)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct MaskRegister(u32);
    impl Debug;
    u32;
    pub msk, set_msk: 28, 0;
    pub u16, std_msk, set_std_msk: 28, 18;
    /// Use the direction bit for acceptance filtering
    pub mdir, set_mdir: 30;
    /// Use the extended identifier bit for acceptance filtering
    pub mxtd, set_mxtd: 31;
}

impl_to_from_u32!(MaskRegister);

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct MessageControlRegister(u32);
    impl Debug;
    u8;
    /// Data Length Code
    pub dlc, set_dlc: 3, 0;
    /// End of buffer (set for single objects, cleared inside a FIFO)
    pub eob, set_eob: 7;
    /// Transmit request
    pub txrqst, set_txrqst: 8;
    /// Remote enable (answer remote frames automatically)
    pub rmten, set_rmten: 9;
    /// Receive interrupt enable
    pub rxie, set_rxie: 10;
    /// Transmit interrupt enable
    pub txie, set_txie: 11;
    /// Use acceptance mask
    pub umask, set_umask: 12;
    /// Interrupt pending
    pub intpnd, set_intpnd: 13;
    /// Message lost (overwritten before it was read)
    pub msglst, set_msglst: 14;
    /// New data
    pub newdat, set_newdat: 15;
}

impl_to_from_u32!(MessageControlRegister);

/// How a message object takes part in bus traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageObjectKind {
    /// Transmits data frames
    Tx = 0,
    /// Transmits a remote frame and receives the answering data frame
    TxRemote = 1,
    /// Receives data frames
    Rx = 2,
    /// Receives remote frames and answers them with its own data
    RxTxRemote = 3,
    /// Receives remote frames without answering them
    RxRemote = 4,
}

impl MessageObjectKind {
    /// Value of the DIR bit for this kind of object
    pub fn direction(&self) -> bool {
        matches!(self, Self::Tx | Self::RxTxRemote | Self::RxRemote)
    }

    /// Objects whose completion is a transmission
    pub fn is_transmit(&self) -> bool {
        matches!(self, Self::Tx | Self::TxRemote)
    }
}

/// Typed description of one message object, encoded to the interface
/// registers by the hardware adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageObjectConfig {
    pub kind: MessageObjectKind,
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub id: StandardId,
    /// `None` accepts the identifier exactly
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub mask: Option<StandardId>,
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub dlc: u4,
    pub enable_interrupt: bool,
}

impl MessageObjectConfig {
    pub fn receive(id: StandardId, mask: StandardId, remote: bool) -> Self {
        Self {
            kind: if remote {
                MessageObjectKind::RxTxRemote
            } else {
                MessageObjectKind::Rx
            },
            id,
            mask: Some(mask),
            dlc: u4::new(MAX_DATA_LEN as u8),
            enable_interrupt: true,
        }
    }

    /// Receive object matching every standard data frame
    pub fn accept_all() -> Self {
        Self {
            kind: MessageObjectKind::Rx,
            id: StandardId::ZERO,
            mask: Some(StandardId::ZERO),
            dlc: u4::new(MAX_DATA_LEN as u8),
            enable_interrupt: true,
        }
    }

    /// Receive object matching every standard remote frame. The direction bit
    /// stays significant, so the object's DIR tells the frame kind.
    pub fn accept_all_remote() -> Self {
        Self {
            kind: MessageObjectKind::RxRemote,
            ..Self::accept_all()
        }
    }

    pub fn transmit(id: StandardId, remote: bool, dlc: u4) -> Self {
        Self {
            kind: if remote {
                MessageObjectKind::TxRemote
            } else {
                MessageObjectKind::Tx
            },
            id,
            mask: None,
            dlc,
            enable_interrupt: true,
        }
    }

    pub fn arbitration(&self) -> ArbitrationRegister {
        let mut arbitration = ArbitrationRegister(0);

        arbitration.set_std_id(self.id.as_raw());
        arbitration.set_dir(self.kind.direction());
        arbitration.set_xtd(false);
        arbitration.set_msgval(true);

        arbitration
    }

    pub fn mask_register(&self) -> MaskRegister {
        let mut mask = MaskRegister(0);

        mask.set_std_msk(self.mask.unwrap_or(StandardId::MAX).as_raw());
        // Only standard frames of the configured direction may match
        mask.set_mxtd(true);
        mask.set_mdir(true);

        mask
    }

    pub fn control(&self) -> MessageControlRegister {
        let mut control = MessageControlRegister(0);

        control.set_dlc(self.dlc.value());
        control.set_eob(true);
        control.set_umask(self.mask.is_some());
        control.set_rmten(self.kind == MessageObjectKind::RxTxRemote);

        if self.enable_interrupt {
            control.set_txie(self.kind.is_transmit());
            control.set_rxie(!self.kind.is_transmit());
        }

        control
    }
}

/// Snapshot of a message object as read back through the interface registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawMessage {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub arbitration: ArbitrationRegister,
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub control: MessageControlRegister,
    pub data: [u8; MAX_DATA_LEN],
}

impl RawMessage {
    /// Assembles a snapshot from the IFxARB, IFxMCTL, IFxDATA and IFxDATB
    /// register values. Data bytes are stored little endian.
    pub fn from_registers(arbitration: u32, control: u32, data_a: u32, data_b: u32) -> Self {
        let mut data = [0u8; MAX_DATA_LEN];

        data[0..4].copy_from_slice(&data_a.to_le_bytes());
        data[4..8].copy_from_slice(&data_b.to_le_bytes());

        Self {
            arbitration: arbitration.into(),
            control: control.into(),
            data,
        }
    }

    pub fn identifier(&self) -> StandardId {
        self.arbitration.identifier()
    }

    pub fn dlc(&self) -> u4 {
        u4::new(self.control.dlc() & 0x0F)
    }

    /// Receive objects with the direction bit set only ever accept remote
    /// frames
    pub fn is_remote(&self) -> bool {
        self.arbitration.dir()
    }

    pub fn message_lost(&self) -> bool {
        self.control.msglst()
    }
}
