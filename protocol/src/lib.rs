//! DHCP message wire format: the fixed BOOTP/DHCP header plus the minimal
//! option codec the connection core in the `dhcp4-client` crate needs.
//!
//! This is not a general-purpose DHCP options library; it only implements
//! the `Outgoing`/`Incoming` contract the connection core was specified
//! against (message type, client identifier, maximum message size,
//! requested IP, server identifier, error message).

mod constants;
mod error;
mod hardware_type;
mod header;
mod incoming;
mod message_type;
mod operation_code;
mod option_tag;
mod outgoing;

pub use constants::{
    CHADDR_LEN, DHCP_PORT_CLIENT, DHCP_PORT_SERVER, FLAG_BROADCAST, UDP_MAX_MESSAGE_SIZE,
};
pub use error::Error;
pub use hardware_type::{HardwareType, ARPHRD_INFINIBAND};
pub use header::Header;
pub use incoming::Incoming;
pub use message_type::MessageType;
pub use operation_code::OperationCode;
pub use option_tag::{overload, OptionTag};
pub use outgoing::Outgoing;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HEADER_SIZE;

    fn ethernet_discover() -> Outgoing {
        let mut message = Outgoing::new(1, 0);
        {
            let header = message.header();
            header.op = OperationCode::BootRequest;
            header.htype = HardwareType::Ethernet;
            header.hlen = 6;
            header.xid = 0xDEAD_BEEF;
            header.chaddr[..6].copy_from_slice(&[0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
        }
        message
            .append(OptionTag::MessageType.into(), &[MessageType::Discover as u8])
            .unwrap();
        message
            .append(OptionTag::MaximumMessageSize.into(), &1500u16.to_be_bytes())
            .unwrap();
        message
    }

    #[test]
    fn round_trips_discover() {
        let outgoing = ethernet_discover();
        let bytes = outgoing.raw();

        let incoming = Incoming::new(&bytes).unwrap();
        let header = incoming.header();
        assert_eq!(header.op, OperationCode::BootRequest);
        assert_eq!(header.xid, 0xDEAD_BEEF);
        assert_eq!(header.secs, 1);
        assert_eq!(&header.chaddr[..6], &[0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);

        let message_type = incoming.query(OptionTag::MessageType.into()).unwrap();
        assert_eq!(message_type, &[MessageType::Discover as u8]);

        let max_size = incoming
            .query(OptionTag::MaximumMessageSize.into())
            .unwrap();
        assert_eq!(max_size, 1500u16.to_be_bytes());
    }

    #[test]
    fn missing_option_is_no_data() {
        let outgoing = ethernet_discover();
        let incoming = Incoming::new(&outgoing.raw()).unwrap();
        let err = incoming.query(OptionTag::ServerIdentifier.into()).unwrap_err();
        assert!(matches!(err, Error::NoData(tag) if tag == OptionTag::ServerIdentifier as u8));
    }

    #[test]
    fn truncated_message_is_rejected() {
        let err = Incoming::new(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, Error::Truncated(10)));
    }

    #[test]
    fn bad_cookie_is_rejected() {
        let mut bytes = ethernet_discover().raw();
        bytes[HEADER_SIZE] = 0;
        let err = Incoming::new(&bytes).unwrap_err();
        assert!(matches!(err, Error::BadCookie));
    }

    #[test]
    fn message_type_display() {
        assert_eq!(MessageType::Discover.to_string(), "DHCPDISCOVER");
        assert_eq!(MessageType::from_u8(1).unwrap(), MessageType::Discover);
        assert!(MessageType::from_u8(200).is_err());
    }
}
