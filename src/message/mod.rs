use arbitrary_int::u4;
use embedded_can::{Id, StandardId};

use crate::memory::interface::RawMessage;

pub mod rx;
pub mod tx;

/// The maximum data buffer (payload) size in bytes
pub const MAX_DATA_LEN: usize = 8;

pub fn dlc_for_len(len: usize) -> Option<u4> {
    if len > MAX_DATA_LEN {
        return None;
    }

    Some(u4::new(len as u8))
}

/// Classic CAN: DLC values 9 to 15 all mean 8 data bytes
pub fn len_for_dlc(dlc: u4) -> usize {
    usize::from(dlc.value()).min(MAX_DATA_LEN)
}

/// A standard identifier CAN frame as handed to receive handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanFrame {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    id: StandardId,
    remote: bool,
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    dlc: u4,
    data: [u8; MAX_DATA_LEN],
}

impl CanFrame {
    /// Builds the frame from a message object snapshot. Identifier and DLC
    /// come straight from the arbitration and control registers.
    pub fn from_raw(raw: &RawMessage) -> Self {
        Self {
            id: raw.identifier(),
            remote: raw.is_remote(),
            dlc: raw.dlc(),
            data: raw.data,
        }
    }

    pub fn standard_id(&self) -> StandardId {
        self.id
    }

    /// Identifier with the remote flag in bit 11, the key used for software
    /// acceptance filtering
    pub fn filter_key(&self) -> u16 {
        rx::filter_key(self.id, self.remote)
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let Id::Standard(id) = id.into() else {
            return None;
        };

        let dlc = dlc_for_len(data.len())?;

        let mut buffer = [0u8; MAX_DATA_LEN];
        buffer[..data.len()].copy_from_slice(data);

        Some(Self {
            id,
            remote: false,
            dlc,
            data: buffer,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        let Id::Standard(id) = id.into() else {
            return None;
        };

        Some(Self {
            id,
            remote: true,
            dlc: dlc_for_len(dlc)?,
            data: [0u8; MAX_DATA_LEN],
        })
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        usize::from(self.dlc.value())
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..len_for_dlc(self.dlc)]
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_can::{ExtendedId, Frame};

    use super::*;

    #[test]
    fn dlc_conversions() {
        assert_eq!(dlc_for_len(0), Some(u4::new(0)));
        assert_eq!(dlc_for_len(8), Some(u4::new(8)));
        assert_eq!(dlc_for_len(9), None);

        assert_eq!(len_for_dlc(u4::new(5)), 5);
        assert_eq!(len_for_dlc(u4::new(12)), 8);
    }

    #[test]
    fn data_frame_construction() {
        let id = StandardId::new(0x181).unwrap();
        let frame = CanFrame::new(id, &[1, 2, 3]).unwrap();

        assert_eq!(frame.id(), Id::Standard(id));
        assert_eq!(frame.dlc(), 3);
        assert_eq!(frame.data(), &[1, 2, 3]);
        assert!(frame.is_data_frame());
        assert!(frame.is_standard());

        assert!(CanFrame::new(id, &[0; 9]).is_none());
        assert!(CanFrame::new(ExtendedId::new(0x1234).unwrap(), &[]).is_none());
    }

    #[test]
    fn remote_frame_has_no_data() {
        let id = StandardId::new(0x701).unwrap();
        let frame = CanFrame::new_remote(id, 1).unwrap();

        assert!(frame.is_remote_frame());
        assert_eq!(frame.dlc(), 1);
        assert!(frame.data().is_empty());
        assert_eq!(frame.filter_key(), 0x701 | 0x800);
    }

    #[test]
    fn oversized_dlc_from_hardware_reads_eight_bytes() {
        let raw = RawMessage::from_registers(0x181 << 18, 0xF, 0x0403_0201, 0x0807_0605);
        let frame = CanFrame::from_raw(&raw);

        assert_eq!(frame.dlc(), 15);
        assert_eq!(frame.data(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
