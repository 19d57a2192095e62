/// The fixed header's `htype` field (assigned by IANA ARP hardware types).
///
/// Only the two values this codebase's connection logic branches on are
/// named; any other value round-trips through [`HardwareType::Other`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HardwareType {
    Ethernet,
    /// `ARPHRD_INFINIBAND` (Linux `if_arp.h`). InfiniBand cannot accept a
    /// unicast reply before the client address is configured, which is why
    /// the connection forces broadcast and a null `chaddr` for it.
    InfiniBand,
    Other(u8),
}

/// `ARPHRD_INFINIBAND` from Linux's `<net/if_arp.h>`.
pub const ARPHRD_INFINIBAND: u8 = 32;

impl From<u8> for HardwareType {
    fn from(value: u8) -> Self {
        match value {
            1 => HardwareType::Ethernet,
            ARPHRD_INFINIBAND => HardwareType::InfiniBand,
            other => HardwareType::Other(other),
        }
    }
}

impl From<HardwareType> for u8 {
    fn from(value: HardwareType) -> Self {
        match value {
            HardwareType::Ethernet => 1,
            HardwareType::InfiniBand => ARPHRD_INFINIBAND,
            HardwareType::Other(raw) => raw,
        }
    }
}
