use bitflags::bitflags;

bitflags! {
    /// Lifecycle hooks a contact model wants the dispatcher to invoke.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// Resolve per-type material properties during initialization.
        const CONNECT_TO_PROPERTIES = 0b0000_0001;
        /// Called once per step for every pair in contact.
        const COLLISION = 0b0000_0010;
        /// Called once per step for every listed pair not in contact.
        const NO_COLLISION = 0b0000_0100;
    }
}

bitflags! {
    /// Per-contact markers recording which models currently consider the pair touching.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TouchFlags: u32 {
        const NORMAL_MODEL = 0b0000_0001;
        const TANGENTIAL_MODEL = 0b0000_0010;
        const COHESION_MODEL = 0b0000_0100;
        const ROLLING_MODEL = 0b0000_1000;
        const SURFACE_MODEL = 0b0001_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_flags_set_and_clear_independently() {
        let mut touch = TouchFlags::NORMAL_MODEL;
        touch |= TouchFlags::ROLLING_MODEL;
        assert!(touch.contains(TouchFlags::NORMAL_MODEL | TouchFlags::ROLLING_MODEL));

        touch &= !TouchFlags::ROLLING_MODEL;
        assert_eq!(touch, TouchFlags::NORMAL_MODEL);
    }
}
