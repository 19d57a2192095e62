use std::net::Ipv4Addr;

use dhcp4_protocol::{Incoming, MessageType, OperationCode, OptionTag, Outgoing, UDP_MAX_MESSAGE_SIZE};
use dhcp4_transport::{RawEndpoint, RecvResult, SocketFactory, UdpEndpoint, DHCP_PORT_CLIENT};
use mio::{Registry, Token};

use crate::identity::Identity;
use crate::state::TransportState;
use crate::Error;

/// One of the three ways an outgoing message leaves the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Egress {
    RawBroadcast,
    UdpBroadcast,
    UdpUnicast,
}

/// The transport state machine, inbound dispatcher and outbound message
/// builder for one DHCP client attempt on one interface.
///
/// Generic over `F: SocketFactory` so tests can swap in in-memory fake
/// endpoints instead of opening real `AF_PACKET`/UDP sockets.
pub struct Connection<F: SocketFactory> {
    factory: F,
    identity: Identity,
    state: TransportState,
    raw: Option<F::Raw>,
    udp: Option<F::Udp>,
    ciaddr: Ipv4Addr,
    siaddr: Ipv4Addr,
}

impl<F: SocketFactory> Connection<F> {
    /// Creates a connection in state INIT. `identity` has already passed
    /// the `hlen`/`idlen` validation in [`Identity::new`].
    pub fn new(factory: F, identity: Identity) -> Self {
        Connection {
            factory,
            identity,
            state: TransportState::Init,
            raw: None,
            udp: None,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Opens the raw link-layer endpoint and registers it for
    /// read-readiness. Precondition: state = INIT.
    pub fn listen(&mut self, registry: &Registry, token: Token) -> Result<(), Error> {
        self.require_state(TransportState::Init, "listen")?;

        let mut raw = self.factory.open_raw(&self.identity.iface, DHCP_PORT_CLIENT)?;
        raw.register(registry, token)?;
        self.raw = Some(raw);
        self.state = TransportState::Packet;
        log::info!("{}: listening on raw endpoint", self.identity.iface);
        Ok(())
    }

    /// Opens the UDP endpoint bound to `client_ip` and connected to
    /// `server_ip`, shuts down the raw endpoint's send side, and moves to
    /// DRAINING. Precondition: state = PACKET.
    pub fn connect(
        &mut self,
        registry: &Registry,
        token: Token,
        client_ip: Ipv4Addr,
        server_ip: Ipv4Addr,
    ) -> Result<(), Error> {
        self.require_state(TransportState::Packet, "connect")?;

        let mut udp = self
            .factory
            .open_udp(&self.identity.iface, client_ip, DHCP_PORT_CLIENT)?;
        udp.connect(server_ip)?;
        udp.register(registry, token)?;

        if let Some(raw) = self.raw.as_mut() {
            raw.shutdown_send();
        }
        self.udp = Some(udp);
        self.ciaddr = client_ip;
        self.siaddr = server_ip;
        self.state = TransportState::Draining;
        log::info!(
            "{}: bound {}, draining raw endpoint before switching to udp",
            self.identity.iface,
            client_ip
        );
        Ok(())
    }

    /// Deregisters and closes whichever endpoints are open, and resets to
    /// INIT. Safe to call from any state.
    pub fn deinit(&mut self, registry: &Registry) {
        if let Some(mut raw) = self.raw.take() {
            if let Err(e) = raw.deregister(registry) {
                log::warn!("{}: deregistering raw endpoint: {}", self.identity.iface, e);
            }
        }
        if let Some(mut udp) = self.udp.take() {
            if let Err(e) = udp.deregister(registry) {
                log::warn!("{}: deregistering udp endpoint: {}", self.identity.iface, e);
            }
        }
        self.ciaddr = Ipv4Addr::UNSPECIFIED;
        self.siaddr = Ipv4Addr::UNSPECIFIED;
        self.state = TransportState::Init;
    }

    /// Reads one datagram from whichever endpoint is currently active,
    /// verifies it against the connection identity, and returns it. In
    /// DRAINING, promotes to UDP exactly when the raw endpoint reports it
    /// has nothing left queued.
    pub fn dispatch(&mut self, registry: &Registry) -> Result<Option<Incoming>, Error> {
        let mut buf = [0u8; UDP_MAX_MESSAGE_SIZE as usize];

        match self.state {
            TransportState::Init => Err(Error::WrongState("dispatch", "PACKET/DRAINING/UDP", self.state.name())),
            TransportState::Packet => {
                let raw = self.raw.as_mut().expect("PACKET implies an open raw endpoint");
                match raw.recv(&mut buf)? {
                    RecvResult::Data(n) => self.verify(&buf[..n]),
                    RecvResult::NoMessage | RecvResult::WouldBlock => Ok(None),
                }
            }
            TransportState::Draining => {
                let raw = self.raw.as_mut().expect("DRAINING implies an open raw endpoint");
                match raw.recv(&mut buf)? {
                    RecvResult::Data(n) => self.verify(&buf[..n]),
                    RecvResult::NoMessage => Ok(None),
                    RecvResult::WouldBlock => {
                        self.promote_to_udp(registry);
                        self.read_udp(&mut buf)
                    }
                }
            }
            TransportState::Udp => self.read_udp(&mut buf),
        }
    }

    fn read_udp(&mut self, buf: &mut [u8]) -> Result<Option<Incoming>, Error> {
        let udp = self.udp.as_mut().expect("UDP/DRAINING implies an open udp endpoint");
        match udp.recv(buf)? {
            RecvResult::Data(n) => self.verify(&buf[..n]),
            RecvResult::NoMessage | RecvResult::WouldBlock => Ok(None),
        }
    }

    fn promote_to_udp(&mut self, registry: &Registry) {
        if let Some(mut raw) = self.raw.take() {
            if let Err(e) = raw.deregister(registry) {
                log::warn!("{}: deregistering drained raw endpoint: {}", self.identity.iface, e);
            }
        }
        self.state = TransportState::Udp;
        log::info!("{}: raw endpoint drained, now on udp", self.identity.iface);
    }

    fn verify(&self, bytes: &[u8]) -> Result<Option<Incoming>, Error> {
        let incoming = match Incoming::new(bytes) {
            Ok(incoming) => incoming,
            Err(e) if self.identity.strict => return Err(e.into()),
            Err(e) => {
                log::warn!("{}: dropping malformed datagram: {}", self.identity.iface, e);
                return Ok(None);
            }
        };

        if !self.identity_matches(&incoming) {
            log::debug!("{}: dropping datagram for a different client", self.identity.iface);
            return Ok(None);
        }

        Ok(Some(incoming))
    }

    fn identity_matches(&self, incoming: &Incoming) -> bool {
        let hlen = self.identity.chaddr.len();
        if incoming.header().chaddr[..hlen] != self.identity.chaddr[..] {
            return false;
        }

        match incoming.query(OptionTag::ClientIdentifier.into()) {
            Ok(bytes) => bytes == self.identity.client_id.as_slice(),
            Err(_) => self.identity.client_id.is_empty(),
        }
    }

    /// Builds a message with the fixed header, message-type option,
    /// client-identifier option (if any), and the maximum-message-size
    /// option for DISCOVER/REQUEST/INFORM (RFC 2131 §4.4.1).
    fn new_message(&self, message_type: MessageType) -> Result<Outgoing, Error> {
        let mut message = Outgoing::new(0, 0);
        {
            let header = message.header();
            header.op = OperationCode::BootRequest;
            header.htype = self.identity.htype;
            header.ciaddr = self.ciaddr.octets();
            header.set_broadcast(self.identity.request_broadcast());
            if self.identity.send_chaddr() {
                let hlen = self.identity.chaddr.len();
                header.hlen = hlen as u8;
                header.chaddr[..hlen].copy_from_slice(&self.identity.chaddr);
            }
        }

        message.append(OptionTag::MessageType.into(), &[message_type as u8])?;
        if !self.identity.client_id.is_empty() {
            message.append(OptionTag::ClientIdentifier.into(), &self.identity.client_id)?;
        }

        if matches!(
            message_type,
            MessageType::Discover | MessageType::Request | MessageType::Inform
        ) {
            let max_size = match self.state {
                TransportState::Packet if self.identity.mtu != 0 => Some(self.identity.mtu),
                TransportState::Packet => None,
                _ => Some(UDP_MAX_MESSAGE_SIZE),
            };
            if let Some(size) = max_size {
                message.append(OptionTag::MaximumMessageSize.into(), &size.to_be_bytes())?;
            }
        }

        Ok(message)
    }

    fn send(&mut self, egress: Egress, action: &'static str, message: &Outgoing) -> Result<(), Error> {
        let bytes = message.raw();

        match egress {
            Egress::RawBroadcast => {
                self.require_state(TransportState::Packet, action)?;
                let raw = self.raw.as_mut().expect("PACKET implies an open raw endpoint");
                raw.send_broadcast(&self.identity.bhaddr, &bytes)?;
            }
            Egress::UdpBroadcast | Egress::UdpUnicast => {
                if self.state == TransportState::Init || self.state == TransportState::Packet {
                    return Err(Error::WrongState(action, "DRAINING or UDP", self.state.name()));
                }
                let udp = self.udp.as_mut().expect("DRAINING/UDP implies an open udp endpoint");
                match egress {
                    Egress::UdpBroadcast => udp.send_broadcast(&bytes)?,
                    Egress::UdpUnicast => udp.send(&bytes)?,
                    Egress::RawBroadcast => unreachable!(),
                }
            }
        }

        log::info!("{}: sent {} ({} bytes)", self.identity.iface, action, bytes.len());
        Ok(())
    }

    fn require_state(&self, expected: TransportState, action: &'static str) -> Result<(), Error> {
        if self.state != expected {
            return Err(Error::WrongState(action, expected.name(), self.state.name()));
        }
        Ok(())
    }

    /// RFC 2131 §4.4.1: DHCPDISCOVER, broadcast from the raw endpoint.
    pub fn discover(&mut self, xid: u32, secs: u16) -> Result<(), Error> {
        debug_assert_ne!(secs, 0, "secs must be non-zero, some servers reject secs == 0");
        let mut message = self.new_message(MessageType::Discover)?;
        set_xid(&mut message, xid, secs);
        self.send(Egress::RawBroadcast, "DISCOVER", &message)
    }

    /// RFC 2131 §4.3.2: DHCPREQUEST in the SELECTING state, answering a
    /// specific server's offer. Carries requested-ip and server-id.
    pub fn select(&mut self, client: Ipv4Addr, server: Ipv4Addr, xid: u32, secs: u16) -> Result<(), Error> {
        debug_assert_ne!(secs, 0, "secs must be non-zero, some servers reject secs == 0");
        let mut message = self.new_message(MessageType::Request)?;
        set_xid(&mut message, xid, secs);
        message.append(OptionTag::RequestedIpAddress.into(), &client.octets())?;
        message.append(OptionTag::ServerIdentifier.into(), &server.octets())?;
        self.send(Egress::RawBroadcast, "SELECT", &message)
    }

    /// RFC 2131 §4.3.2: DHCPREQUEST in the INIT-REBOOT state, verifying a
    /// remembered lease. Carries requested-ip only, no server-id.
    pub fn reboot(&mut self, client: Ipv4Addr, xid: u32, secs: u16) -> Result<(), Error> {
        debug_assert_ne!(secs, 0, "secs must be non-zero, some servers reject secs == 0");
        let mut message = self.new_message(MessageType::Request)?;
        set_xid(&mut message, xid, secs);
        message.append(OptionTag::RequestedIpAddress.into(), &client.octets())?;
        self.send(Egress::RawBroadcast, "REBOOT", &message)
    }

    /// RFC 2131 §4.3.2: DHCPREQUEST in the RENEWING state, unicast to the
    /// server that granted the lease.
    pub fn renew(&mut self, xid: u32, secs: u16) -> Result<(), Error> {
        debug_assert_ne!(secs, 0, "secs must be non-zero, some servers reject secs == 0");
        let mut message = self.new_message(MessageType::Request)?;
        set_xid(&mut message, xid, secs);
        self.send(Egress::UdpUnicast, "RENEW", &message)
    }

    /// RFC 2131 §4.3.2: DHCPREQUEST in the REBINDING state, broadcast
    /// because the original server may be unreachable.
    pub fn rebind(&mut self, xid: u32, secs: u16) -> Result<(), Error> {
        debug_assert_ne!(secs, 0, "secs must be non-zero, some servers reject secs == 0");
        let mut message = self.new_message(MessageType::Request)?;
        set_xid(&mut message, xid, secs);
        self.send(Egress::UdpBroadcast, "REBIND", &message)
    }

    /// RFC 2131 §4.4.4: DHCPDECLINE. No transaction id is set; the RFC
    /// does not define a reply to wait for.
    pub fn decline(&mut self, client: Ipv4Addr, server: Ipv4Addr, error: Option<&str>) -> Result<(), Error> {
        let mut message = self.new_message(MessageType::Decline)?;
        message.append(OptionTag::RequestedIpAddress.into(), &client.octets())?;
        message.append(OptionTag::ServerIdentifier.into(), &server.octets())?;
        if let Some(text) = error {
            message.append(OptionTag::Message.into(), text.as_bytes())?;
        }
        self.send(Egress::RawBroadcast, "DECLINE", &message)
    }

    /// RFC 2131 §4.4.3: DHCPINFORM, used by a client that already has an
    /// address and only wants configuration parameters.
    pub fn inform(&mut self, xid: u32, secs: u16) -> Result<(), Error> {
        debug_assert_ne!(secs, 0, "secs must be non-zero, some servers reject secs == 0");
        let mut message = self.new_message(MessageType::Inform)?;
        set_xid(&mut message, xid, secs);
        self.send(Egress::UdpBroadcast, "INFORM", &message)
    }

    /// RFC 2131 §4.4.4: DHCPRELEASE, unicast to the server that owns the
    /// lease. No transaction id is set.
    pub fn release(&mut self, error: Option<&str>) -> Result<(), Error> {
        let mut message = self.new_message(MessageType::Release)?;
        message.append(OptionTag::ServerIdentifier.into(), &self.siaddr.octets())?;
        if let Some(text) = error {
            message.append(OptionTag::Message.into(), text.as_bytes())?;
        }
        self.send(Egress::UdpUnicast, "RELEASE", &message)
    }
}

/// Writes the transaction id and seconds-elapsed fields. `secs` must be
/// non-zero (precondition, not a runtime failure: some servers reject
/// DISCOVER/REQUEST with `secs == 0`).
fn set_xid(message: &mut Outgoing, xid: u32, secs: u16) {
    let header = message.header();
    header.xid = xid;
    header.secs = secs;
}
