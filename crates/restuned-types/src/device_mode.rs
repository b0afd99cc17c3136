use bitflags::bitflags;

bitflags! {
    /// Global display/power state bitmask gating which resources may be applied.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceMode: u8 {
        const RESUME  = 0b001;
        const SUSPEND = 0b010;
        const DOZE    = 0b100;
    }
}

impl Default for DeviceMode {
    fn default() -> Self {
        DeviceMode::RESUME
    }
}
