//! System audio seam
//!
//! The host application implements [`AudioControl`] over its platform mixer.
//! Device indices are positions in the platform's enumeration order and stay
//! valid until the next enumeration.

use songlink_protocol::DeviceKind;

/// Master volume of the default output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VolumeState {
    /// 0..=100
    pub volume: u8,
    pub muted: bool,
}

/// Platform mixer operations used by the responder
pub trait AudioControl {
    /// Current volume, `None` when there is no default output
    fn volume_state(&self) -> Option<VolumeState>;

    /// Set the master volume (already clamped to 0..=100)
    fn set_volume(&mut self, volume: u8);

    fn toggle_mute(&mut self);

    /// Re-enumerate endpoints of `kind`; returns how many there are
    fn refresh_devices(&mut self, kind: DeviceKind) -> usize;

    /// Friendly name of the endpoint at `index`
    fn device_name(&self, kind: DeviceKind, index: usize) -> Option<&str>;

    /// Index of the default endpoint of `kind`
    fn current_device(&self, kind: DeviceKind) -> Option<usize>;

    /// Make the endpoint at `index` the default; false if it does not exist
    fn select_device(&mut self, kind: DeviceKind, index: usize) -> bool;
}
