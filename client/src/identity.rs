use dhcp4_protocol::{HardwareType, ARPHRD_INFINIBAND};

use crate::Error;

/// Configures one `Connection`: everything about the client's identity and
/// the knobs the transport core exposes. Constructed once per lease
/// attempt, mirroring this codebase's builder-struct convention rather
/// than a long free-function argument list.
#[derive(Debug, Clone)]
pub struct Identity {
    /// The network interface this connection speaks on.
    pub iface: String,
    /// Link-layer address family, e.g. Ethernet or InfiniBand.
    pub htype: HardwareType,
    /// Client hardware address, `hlen` significant bytes.
    pub chaddr: Vec<u8>,
    /// Link-layer broadcast address used as the L2 destination on the raw
    /// endpoint.
    pub bhaddr: Vec<u8>,
    /// RFC 2132 client identifier option payload. Empty means "none".
    pub client_id: Vec<u8>,
    /// MTU hint advertised as the maximum-message-size option while on
    /// the raw endpoint. Zero means "unknown" (option omitted).
    pub mtu: u16,
    /// When set, a malformed inbound datagram is surfaced as
    /// `Error::Codec` instead of being logged and dropped.
    pub strict: bool,
}

impl Identity {
    /// Builds an identity. Rejects an empty or overlong `chaddr` (`hlen`
    /// must fit in 1..=16, the header's `chaddr` field) and the RFC
    /// prohibition on length-1 client identifiers.
    pub fn new(
        iface: impl Into<String>,
        htype: HardwareType,
        chaddr: Vec<u8>,
        bhaddr: Vec<u8>,
        client_id: Vec<u8>,
        mtu: u16,
        strict: bool,
    ) -> Result<Self, Error> {
        if chaddr.is_empty() {
            return Err(Error::InvalidArgument("chaddr must not be empty".into()));
        }
        if chaddr.len() > dhcp4_protocol::CHADDR_LEN {
            return Err(Error::InvalidArgument(format!(
                "hlen {} exceeds the {}-byte chaddr field",
                chaddr.len(),
                dhcp4_protocol::CHADDR_LEN
            )));
        }
        if client_id.len() == 1 {
            return Err(Error::InvalidArgument(
                "a length-1 client identifier is forbidden by RFC 2132 §9.14".into(),
            ));
        }

        Ok(Identity {
            iface: iface.into(),
            htype,
            chaddr,
            bhaddr,
            client_id,
            mtu,
            strict,
        })
    }

    /// Whether the outgoing header must always carry the BROADCAST flag
    /// and a null `chaddr` (InfiniBand cannot accept a unicast reply
    /// before the address is plumbed).
    pub(crate) fn is_infiniband(&self) -> bool {
        u8::from(self.htype) == ARPHRD_INFINIBAND
    }

    pub(crate) fn request_broadcast(&self) -> bool {
        self.is_infiniband()
    }

    pub(crate) fn send_chaddr(&self) -> bool {
        !self.is_infiniband()
    }
}
