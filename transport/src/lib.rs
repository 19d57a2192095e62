//! The two link-layer/UDP endpoints the connection core multiplexes
//! between while it moves through INIT, PACKET, DRAINING and UDP.
//!
//! This crate knows nothing about DHCP message contents; it only moves
//! opaque byte payloads in and out, leaving encoding to `dhcp4-protocol`.
//! That split mirrors this codebase's own separation between its
//! switchable socket layer and its message codec.

mod error;
mod registry;

#[cfg(target_os = "linux")]
mod raw;
#[cfg(target_os = "linux")]
mod udp;

#[cfg(not(target_os = "linux"))]
mod raw {
    //! Raw `AF_PACKET` sockets are Linux-specific; other platforms get a
    //! type that compiles but cannot be constructed, the same stand-in
    //! this codebase uses for its non-Linux switchable socket build.
    pub struct RawSocket;

    impl RawSocket {
        pub fn open(_iface: &str, _port: u16) -> Result<Self, crate::Error> {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }

        pub fn send_broadcast(&mut self, _bhaddr: &[u8], _payload: &[u8]) -> Result<(), crate::Error> {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }

        pub fn recv(&mut self, _buf: &mut [u8]) -> Result<crate::RecvResult, crate::Error> {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }

        pub fn shutdown_send(&mut self) {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }
    }

    impl crate::RawEndpoint for RawSocket {
        fn send_broadcast(&mut self, _bhaddr: &[u8], _payload: &[u8]) -> Result<(), crate::Error> {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }

        fn recv(&mut self, _buf: &mut [u8]) -> Result<crate::RecvResult, crate::Error> {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }

        fn shutdown_send(&mut self) {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }

        fn register(&mut self, _registry: &mio::Registry, _token: mio::Token) -> std::io::Result<()> {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }

        fn deregister(&mut self, _registry: &mio::Registry) -> std::io::Result<()> {
            unimplemented!("raw link-layer sockets are only implemented for linux")
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod udp {
    use std::net::Ipv4Addr;

    pub struct UdpSocket;

    impl UdpSocket {
        pub fn bind(_iface: &str, _client_addr: Ipv4Addr, _port: u16) -> Result<Self, crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        pub fn connect(&self, _server_addr: Ipv4Addr) -> Result<(), crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        pub fn send(&mut self, _payload: &[u8]) -> Result<(), crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        pub fn send_broadcast(&mut self, _payload: &[u8]) -> Result<(), crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        pub fn recv(&mut self, _buf: &mut [u8]) -> Result<crate::RecvResult, crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        pub fn port(&self) -> u16 {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }
    }

    impl crate::UdpEndpoint for UdpSocket {
        fn connect(&self, _server_addr: Ipv4Addr) -> Result<(), crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        fn send(&mut self, _payload: &[u8]) -> Result<(), crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        fn send_broadcast(&mut self, _payload: &[u8]) -> Result<(), crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        fn recv(&mut self, _buf: &mut [u8]) -> Result<crate::RecvResult, crate::Error> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        fn register(&mut self, _registry: &mio::Registry, _token: mio::Token) -> std::io::Result<()> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }

        fn deregister(&mut self, _registry: &mio::Registry) -> std::io::Result<()> {
            unimplemented!("SO_BINDTODEVICE is only implemented for linux")
        }
    }
}

pub use error::Error;
pub use raw::RawSocket;
pub use registry::{deregister, register};
pub use udp::UdpSocket;

use std::io;
use std::net::Ipv4Addr;

use mio::{Registry, Token};

/// The raw-endpoint capability the connection core needs, factored out so
/// tests can substitute an in-memory fake for the real `AF_PACKET` socket.
pub trait RawEndpoint {
    fn send_broadcast(&mut self, bhaddr: &[u8], payload: &[u8]) -> Result<(), Error>;
    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult, Error>;
    fn shutdown_send(&mut self);
    fn register(&mut self, registry: &Registry, token: Token) -> io::Result<()>;
    fn deregister(&mut self, registry: &Registry) -> io::Result<()>;
}

/// The UDP-endpoint capability the connection core needs.
pub trait UdpEndpoint {
    fn connect(&self, server_addr: Ipv4Addr) -> Result<(), Error>;
    fn send(&mut self, payload: &[u8]) -> Result<(), Error>;
    fn send_broadcast(&mut self, payload: &[u8]) -> Result<(), Error>;
    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult, Error>;
    fn register(&mut self, registry: &Registry, token: Token) -> io::Result<()>;
    fn deregister(&mut self, registry: &Registry) -> io::Result<()>;
}

/// Opens the pair of endpoints a connection needs. Split out as a trait
/// (the "fixed capability record" of a socket factory) so the connection
/// core stays generic over production sockets and test fakes alike.
pub trait SocketFactory {
    type Raw: RawEndpoint;
    type Udp: UdpEndpoint;

    fn open_raw(&self, iface: &str, port: u16) -> Result<Self::Raw, Error>;
    fn open_udp(&self, iface: &str, client_addr: Ipv4Addr, port: u16) -> Result<Self::Udp, Error>;
}

/// The production [`SocketFactory`], backed by real `AF_PACKET`/UDP
/// sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSockets;

impl SocketFactory for SystemSockets {
    type Raw = RawSocket;
    type Udp = UdpSocket;

    fn open_raw(&self, iface: &str, port: u16) -> Result<RawSocket, Error> {
        RawSocket::open(iface, port)
    }

    fn open_udp(&self, iface: &str, client_addr: Ipv4Addr, port: u16) -> Result<UdpSocket, Error> {
        UdpSocket::bind(iface, client_addr, port)
    }
}

/// Well-known DHCP server port (RFC 2131 §4.1). Kept local to this crate
/// rather than pulled from `dhcp4-protocol`, since the transport layer is
/// deliberately payload-agnostic.
pub const DHCP_PORT_SERVER: u16 = 67;
/// Well-known DHCP client port.
pub const DHCP_PORT_CLIENT: u16 = 68;

/// The three outcomes a non-blocking endpoint read can have, kept distinct
/// because the connection core's PACKET->UDP promotion hinges on telling
/// "nothing queued right now" apart from "received a genuine zero-length
/// datagram".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvResult {
    /// A datagram of this many bytes was copied into the caller's buffer.
    Data(usize),
    /// A read completed but yielded no usable message (for the raw
    /// endpoint: either a zero-length frame, or a frame that wasn't a DHCP
    /// datagram addressed to us).
    NoMessage,
    /// The endpoint has nothing queued; the caller should wait for the
    /// next readiness notification.
    WouldBlock,
}
