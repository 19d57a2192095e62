//! The DHCPv4 client-side transport and outbound message-construction
//! core: a link-layer/UDP transport duality, an inbound dispatcher that
//! verifies client identity, and one sender per RFC 2131 client action.
//!
//! This crate does not decide *when* to send a DISCOVER or a RENEW, does
//! not generate transaction ids, and does not run timers — those belong
//! to a lease state machine built on top. It exposes pollable endpoints
//! and trusts the caller to drive `dispatch` and the per-action senders
//! in a valid order.

mod connection;
mod error;
mod identity;
mod state;

pub use connection::Connection;
pub use error::Error;
pub use identity::Identity;
pub use state::TransportState;

pub use dhcp4_transport::SystemSockets;

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::net::Ipv4Addr;
    use std::rc::Rc;

    use dhcp4_protocol::{HardwareType, OptionTag, ARPHRD_INFINIBAND};
    use dhcp4_transport::{Error as TransportError, RawEndpoint, RecvResult, SocketFactory, UdpEndpoint};
    use mio::{Poll, Token};

    use super::*;

    type Sent = Rc<RefCell<Vec<(Vec<u8>, Vec<u8>)>>>;
    type SentUdp = Rc<RefCell<Vec<(bool, Vec<u8>)>>>;

    /// An in-memory stand-in for the raw endpoint: outbound sends are
    /// recorded into a handle the test keeps, inbound datagrams are
    /// served from a queue seeded before the endpoint is opened.
    struct FakeRaw {
        sent: Sent,
        inbox: VecDeque<Vec<u8>>,
        shut_down: bool,
    }

    impl RawEndpoint for FakeRaw {
        fn send_broadcast(&mut self, bhaddr: &[u8], payload: &[u8]) -> Result<(), TransportError> {
            if self.shut_down {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "send side shut down").into());
            }
            self.sent.borrow_mut().push((bhaddr.to_vec(), payload.to_vec()));
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult, TransportError> {
            match self.inbox.pop_front() {
                Some(datagram) => {
                    let len = datagram.len().min(buf.len());
                    buf[..len].copy_from_slice(&datagram[..len]);
                    Ok(RecvResult::Data(len))
                }
                None => Ok(RecvResult::WouldBlock),
            }
        }

        fn shutdown_send(&mut self) {
            self.shut_down = true;
        }

        fn register(&mut self, _registry: &mio::Registry, _token: Token) -> io::Result<()> {
            Ok(())
        }

        fn deregister(&mut self, _registry: &mio::Registry) -> io::Result<()> {
            Ok(())
        }
    }

    struct FakeUdp {
        sent: SentUdp,
        inbox: VecDeque<Vec<u8>>,
    }

    impl UdpEndpoint for FakeUdp {
        fn connect(&self, _server_addr: Ipv4Addr) -> Result<(), TransportError> {
            Ok(())
        }

        fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
            self.sent.borrow_mut().push((false, payload.to_vec()));
            Ok(())
        }

        fn send_broadcast(&mut self, payload: &[u8]) -> Result<(), TransportError> {
            self.sent.borrow_mut().push((true, payload.to_vec()));
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult, TransportError> {
            match self.inbox.pop_front() {
                Some(datagram) => {
                    let len = datagram.len().min(buf.len());
                    buf[..len].copy_from_slice(&datagram[..len]);
                    Ok(RecvResult::Data(len))
                }
                None => Ok(RecvResult::WouldBlock),
            }
        }

        fn register(&mut self, _registry: &mio::Registry, _token: Token) -> io::Result<()> {
            Ok(())
        }

        fn deregister(&mut self, _registry: &mio::Registry) -> io::Result<()> {
            Ok(())
        }
    }

    /// A socket factory backed entirely by in-memory queues, so transport
    /// state machine and message-builder tests never open a real socket.
    #[derive(Default)]
    struct FakeFactory {
        raw_inbox: RefCell<VecDeque<Vec<u8>>>,
        udp_inbox: RefCell<VecDeque<Vec<u8>>>,
        raw_sent: Sent,
        udp_sent: SentUdp,
    }

    impl SocketFactory for FakeFactory {
        type Raw = FakeRaw;
        type Udp = FakeUdp;

        fn open_raw(&self, _iface: &str, _port: u16) -> Result<FakeRaw, TransportError> {
            Ok(FakeRaw {
                sent: self.raw_sent.clone(),
                inbox: self.raw_inbox.borrow_mut().drain(..).collect(),
                shut_down: false,
            })
        }

        fn open_udp(&self, _iface: &str, _client_addr: Ipv4Addr, _port: u16) -> Result<FakeUdp, TransportError> {
            Ok(FakeUdp {
                sent: self.udp_sent.clone(),
                inbox: self.udp_inbox.borrow_mut().drain(..).collect(),
            })
        }
    }

    fn ethernet_identity() -> Identity {
        Identity::new(
            "eth0",
            HardwareType::Ethernet,
            vec![0x52, 0x54, 0x00, 0x12, 0x34, 0x56],
            vec![0xff; 6],
            Vec::new(),
            1500,
            false,
        )
        .unwrap()
    }

    /// Builds a connection plus the shared handles the test uses to
    /// inspect what it sent, and to seed what it will read back.
    fn harness(identity: Identity) -> (Connection<FakeFactory>, Poll, Token, Sent, SentUdp) {
        let factory = FakeFactory::default();
        let raw_sent = factory.raw_sent.clone();
        let udp_sent = factory.udp_sent.clone();
        let connection = Connection::new(factory, identity);
        (connection, Poll::new().unwrap(), Token(0), raw_sent, udp_sent)
    }

    #[test]
    fn invalid_hlen_is_rejected() {
        let err = Identity::new(
            "eth0",
            HardwareType::Ethernet,
            vec![0u8; 17],
            vec![0xff; 6],
            Vec::new(),
            1500,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn empty_chaddr_is_rejected() {
        let err = Identity::new(
            "eth0",
            HardwareType::Ethernet,
            Vec::new(),
            vec![0xff; 6],
            Vec::new(),
            1500,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn dispatch_before_listen_is_wrong_state_not_a_panic() {
        let (mut connection, poll, _token, _raw_sent, _udp_sent) = harness(ethernet_identity());
        let err = connection.dispatch(poll.registry()).unwrap_err();
        assert!(matches!(err, Error::WrongState("dispatch", _, "INIT")));
    }

    #[test]
    fn length_one_client_id_is_rejected() {
        let err = Identity::new(
            "eth0",
            HardwareType::Ethernet,
            vec![0x52, 0x54, 0x00, 0x12, 0x34, 0x56],
            vec![0xff; 6],
            vec![1],
            1500,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn infiniband_forces_broadcast_and_null_chaddr() {
        let identity = Identity::new(
            "ib0",
            HardwareType::from(ARPHRD_INFINIBAND),
            vec![0u8; 20],
            vec![0xff; 20],
            vec![0u8; 9],
            0,
            false,
        )
        .unwrap();
        let (mut connection, poll, token, raw_sent, _udp_sent) = harness(identity);
        connection.listen(poll.registry(), token).unwrap();

        connection.discover(0xDEAD_BEEF, 1).unwrap();

        let sent = raw_sent.borrow();
        let message = dhcp4_protocol::Incoming::new(&sent[0].1).unwrap();
        assert!(message.header().is_broadcast());
        assert_eq!(message.header().hlen, 0);
        assert_eq!(message.header().chaddr, [0u8; 16]);
        assert!(message.query(OptionTag::MaximumMessageSize.into()).is_err());
    }

    #[test]
    fn ethernet_discover_matches_scenario_a() {
        let (mut connection, poll, token, raw_sent, _udp_sent) = harness(ethernet_identity());
        connection.listen(poll.registry(), token).unwrap();

        connection.discover(0xDEAD_BEEF, 1).unwrap();

        let sent = raw_sent.borrow();
        assert_eq!(sent[0].0, vec![0xff; 6]);
        let message = dhcp4_protocol::Incoming::new(&sent[0].1).unwrap();
        assert!(!message.header().is_broadcast());
        assert_eq!(&message.header().chaddr[..6], &[0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
        assert_eq!(message.header().xid, 0xDEAD_BEEF);
        let max_size = message.query(OptionTag::MaximumMessageSize.into()).unwrap();
        assert_eq!(max_size, 1500u16.to_be_bytes());
    }

    #[test]
    fn select_matches_scenario_c() {
        let (mut connection, poll, token, raw_sent, _udp_sent) = harness(ethernet_identity());
        connection.listen(poll.registry(), token).unwrap();

        let client = Ipv4Addr::new(192, 0, 2, 5);
        let server = Ipv4Addr::new(192, 0, 2, 1);
        connection.select(client, server, 1, 2).unwrap();

        let sent = raw_sent.borrow();
        let message = dhcp4_protocol::Incoming::new(&sent[0].1).unwrap();
        assert_eq!(
            message.query(OptionTag::RequestedIpAddress.into()).unwrap(),
            &client.octets()
        );
        assert_eq!(
            message.query(OptionTag::ServerIdentifier.into()).unwrap(),
            &server.octets()
        );
    }

    #[test]
    fn udp_senders_fail_in_packet_state() {
        let (mut connection, poll, token, _raw_sent, _udp_sent) = harness(ethernet_identity());
        connection.listen(poll.registry(), token).unwrap();

        let err = connection.renew(1, 1).unwrap_err();
        assert!(matches!(err, Error::WrongState("RENEW", _, "PACKET")));
    }

    #[test]
    fn raw_broadcast_fails_outside_packet() {
        let (mut connection, poll, token, _raw_sent, _udp_sent) = harness(ethernet_identity());
        connection.listen(poll.registry(), token).unwrap();
        connection
            .connect(poll.registry(), token, Ipv4Addr::new(192, 0, 2, 5), Ipv4Addr::new(192, 0, 2, 1))
            .unwrap();

        let err = connection.discover(1, 1).unwrap_err();
        assert!(matches!(err, Error::WrongState("DISCOVER", _, "DRAINING")));
    }

    #[test]
    fn renew_after_connect_matches_scenario_d() {
        let (mut connection, poll, token, _raw_sent, udp_sent) = harness(ethernet_identity());
        connection.listen(poll.registry(), token).unwrap();
        let client = Ipv4Addr::new(192, 0, 2, 5);
        let server = Ipv4Addr::new(192, 0, 2, 1);
        connection.connect(poll.registry(), token, client, server).unwrap();

        connection.renew(7, 3).unwrap();

        let sent = udp_sent.borrow();
        assert!(!sent[0].0, "renew must unicast, not broadcast");
        let message = dhcp4_protocol::Incoming::new(&sent[0].1).unwrap();
        assert_eq!(message.header().ciaddr, client.octets());
    }

    #[test]
    fn rebind_broadcasts_with_no_server_id() {
        let (mut connection, poll, token, _raw_sent, udp_sent) = harness(ethernet_identity());
        connection.listen(poll.registry(), token).unwrap();
        connection
            .connect(poll.registry(), token, Ipv4Addr::new(192, 0, 2, 5), Ipv4Addr::new(192, 0, 2, 1))
            .unwrap();

        connection.rebind(9, 1).unwrap();

        let sent = udp_sent.borrow();
        assert!(sent[0].0, "rebind must broadcast");
        let message = dhcp4_protocol::Incoming::new(&sent[0].1).unwrap();
        assert!(message.query(OptionTag::ServerIdentifier.into()).is_err());
    }

    #[test]
    fn release_carries_server_id_and_error_message() {
        let (mut connection, poll, token, _raw_sent, udp_sent) = harness(ethernet_identity());
        connection.listen(poll.registry(), token).unwrap();
        connection
            .connect(poll.registry(), token, Ipv4Addr::new(192, 0, 2, 5), Ipv4Addr::new(192, 0, 2, 1))
            .unwrap();

        connection.release(Some("lease released by user")).unwrap();

        let sent = udp_sent.borrow();
        assert!(!sent[0].0, "release must unicast");
        let message = dhcp4_protocol::Incoming::new(&sent[0].1).unwrap();
        assert_eq!(
            message.query(OptionTag::ServerIdentifier.into()).unwrap(),
            &[192, 0, 2, 1]
        );
        assert_eq!(
            message.query(OptionTag::Message.into()).unwrap(),
            b"lease released by user"
        );
    }

    #[test]
    fn draining_delivers_raw_then_promotes_on_would_block() {
        let factory = FakeFactory::default();
        factory.raw_inbox.borrow_mut().push_back(ethernet_identity_discover());
        let raw_sent = factory.raw_sent.clone();
        let mut connection = Connection::new(factory, ethernet_identity());
        let poll = Poll::new().unwrap();
        let token = Token(0);
        connection.listen(poll.registry(), token).unwrap();
        connection
            .connect(poll.registry(), token, Ipv4Addr::new(192, 0, 2, 5), Ipv4Addr::new(192, 0, 2, 1))
            .unwrap();

        assert_eq!(connection.state(), TransportState::Draining);
        let first = connection.dispatch(poll.registry()).unwrap();
        assert!(first.is_some(), "queued raw datagram must be delivered first");
        assert_eq!(connection.state(), TransportState::Draining);

        let second = connection.dispatch(poll.registry()).unwrap();
        assert!(second.is_none(), "no udp datagram queued yet");
        assert_eq!(connection.state(), TransportState::Udp);

        assert!(raw_sent.borrow().is_empty());
    }

    #[test]
    fn mismatched_chaddr_is_dropped() {
        let mut foreign = dhcp4_protocol::Outgoing::new(1, 0);
        foreign.header().chaddr[..6].copy_from_slice(&[0, 0, 0, 0, 0, 0]);
        foreign
            .append(OptionTag::MessageType.into(), &[dhcp4_protocol::MessageType::Offer as u8])
            .unwrap();

        let factory = FakeFactory::default();
        factory.raw_inbox.borrow_mut().push_back(foreign.raw());
        let mut connection = Connection::new(factory, ethernet_identity());
        let poll = Poll::new().unwrap();
        let token = Token(0);
        connection.listen(poll.registry(), token).unwrap();

        let result = connection.dispatch(poll.registry()).unwrap();
        assert!(result.is_none());
    }

    /// A well-formed DHCPOFFER matching `ethernet_identity`'s `chaddr`, for
    /// seeding a fake endpoint's inbox.
    fn ethernet_identity_discover() -> Vec<u8> {
        let mut message = dhcp4_protocol::Outgoing::new(1, 0);
        message.header().chaddr[..6].copy_from_slice(&[0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
        message
            .append(OptionTag::MessageType.into(), &[dhcp4_protocol::MessageType::Offer as u8])
            .unwrap();
        message.raw()
    }
}
