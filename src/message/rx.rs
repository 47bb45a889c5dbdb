use embedded_can::StandardId;

use super::CanFrame;

/// Bit marking a remote frame in a filter key. It is always part of the mask,
/// so a data frame never matches a remote filter and vice versa.
pub const REMOTE_FLAG: u16 = 0x0800;

/// Packs identifier and remote flag the way acceptance filtering compares them
pub fn filter_key(id: StandardId, remote: bool) -> u16 {
    let key = id.as_raw() & StandardId::MAX.as_raw();

    if remote {
        key | REMOTE_FLAG
    } else {
        key
    }
}

/// Called with every frame accepted for a receive slot.
///
/// Runs in interrupt context: keep it short and non-blocking. Handlers may
/// call [`CanModule::send`](crate::CanModule::send), the receive path holds no
/// lock while a handler runs.
pub trait RxHandler {
    fn on_receive(&self, frame: &CanFrame);
}

impl<F> RxHandler for F
where
    F: Fn(&CanFrame),
{
    fn on_receive(&self, frame: &CanFrame) {
        self(frame)
    }
}

pub type RxHandlerRef<'a> = &'a (dyn RxHandler + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxFilter {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub id: StandardId,
    /// Bits set here must match, cleared bits are don't care
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub mask: StandardId,
    pub remote: bool,
}

impl RxFilter {
    pub fn new(id: StandardId, mask: StandardId, remote: bool) -> Self {
        Self { id, mask, remote }
    }

    pub fn key(&self) -> u16 {
        filter_key(self.id, self.remote)
    }

    pub fn key_mask(&self) -> u16 {
        (self.mask.as_raw() & StandardId::MAX.as_raw()) | REMOTE_FLAG
    }

    pub fn matches(&self, frame: &CanFrame) -> bool {
        (frame.filter_key() ^ self.key()) & self.key_mask() == 0
    }
}

/// One receive filter and the handler its frames are delivered to
#[derive(Clone, Copy)]
pub struct RxSlot<'a> {
    filter: RxFilter,
    handler: Option<RxHandlerRef<'a>>,
}

impl<'a> RxSlot<'a> {
    /// Unconfigured slot, never fires
    pub const EMPTY: Self = Self {
        filter: RxFilter {
            id: StandardId::ZERO,
            mask: StandardId::MAX,
            remote: false,
        },
        handler: None,
    };

    pub(crate) fn configure(&mut self, filter: RxFilter, handler: RxHandlerRef<'a>) {
        self.filter = filter;
        self.handler = Some(handler);
    }

    pub fn filter(&self) -> &RxFilter {
        &self.filter
    }

    pub fn is_configured(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn handler(&self) -> Option<RxHandlerRef<'a>> {
        self.handler
    }

    /// Software acceptance: the slot must be configured and its filter match
    pub fn accepts(&self, frame: &CanFrame) -> bool {
        self.is_configured() && self.filter.matches(frame)
    }
}

impl Default for RxSlot<'_> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl core::fmt::Debug for RxSlot<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RxSlot")
            .field("filter", &self.filter)
            .field("configured", &self.is_configured())
            .finish()
    }
}
