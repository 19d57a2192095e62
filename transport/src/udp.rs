//! The UDP endpoint the connection core switches to once it has an
//! address (the UDP state).
//!
//! Grounded on this codebase's `bind_to_device_raw`: a standard
//! `std::net::UdpSocket` bound to both an address and an interface, so a
//! box with several interfaces on the same subnet still only sees traffic
//! meant for this lease.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::os::unix::io::AsRawFd;

use mio::event::Source;
use mio::net::UdpSocket as MioUdpSocket;
use mio::{Interest, Registry, Token};

use crate::{Error, RecvResult};

/// A non-blocking UDP endpoint bound to one interface and one client
/// address, optionally connected to a single server.
pub struct UdpSocket {
    inner: MioUdpSocket,
    port: u16,
}

impl UdpSocket {
    /// Binds to `(client_addr, port)` on `iface` with broadcast enabled.
    pub fn bind(iface: &str, client_addr: Ipv4Addr, port: u16) -> Result<Self, Error> {
        let std_socket = std::net::UdpSocket::bind(SocketAddrV4::new(client_addr, port))?;
        std_socket.set_nonblocking(true)?;
        std_socket.set_broadcast(true)?;
        bind_to_device(&std_socket, iface)?;

        Ok(UdpSocket {
            inner: MioUdpSocket::from_std(std_socket),
            port,
        })
    }

    /// Connects to `server_addr`, so subsequent [`send`](Self::send) calls
    /// unicast to that peer only.
    pub fn connect(&self, server_addr: Ipv4Addr) -> Result<(), Error> {
        self.inner
            .connect(SocketAddr::V4(SocketAddrV4::new(server_addr, crate::DHCP_PORT_SERVER)))?;
        Ok(())
    }

    /// Sends to the connected peer.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.inner.send(payload)?;
        Ok(())
    }

    /// Sends to `255.255.255.255:67` regardless of any connected peer.
    pub fn send_broadcast(&mut self, payload: &[u8]) -> Result<(), Error> {
        let dest = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, crate::DHCP_PORT_SERVER));
        self.inner.send_to(payload, dest)?;
        Ok(())
    }

    /// Reads one datagram. Returns [`RecvResult::WouldBlock`] when the
    /// socket has nothing queued, matching [`crate::raw::RawSocket::recv`]'s
    /// contract so the connection core can poll either endpoint uniformly.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult, Error> {
        match self.inner.recv(buf) {
            Ok(0) => Ok(RecvResult::NoMessage),
            Ok(n) => Ok(RecvResult::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(RecvResult::WouldBlock),
            Err(e) => Err(e.into()),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

}

impl crate::UdpEndpoint for UdpSocket {
    fn connect(&self, server_addr: Ipv4Addr) -> Result<(), Error> {
        UdpSocket::connect(self, server_addr)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        UdpSocket::send(self, payload)
    }

    fn send_broadcast(&mut self, payload: &[u8]) -> Result<(), Error> {
        UdpSocket::send_broadcast(self, payload)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult, Error> {
        UdpSocket::recv(self, buf)
    }

    fn register(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        crate::register(registry, self, token)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        crate::deregister(registry, self)
    }
}

impl Source for UdpSocket {
    fn register(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        self.inner.register(registry, token, interests)
    }

    fn reregister(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        self.inner.reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        self.inner.deregister(registry)
    }
}

#[cfg(target_os = "linux")]
fn bind_to_device(socket: &std::net::UdpSocket, iface: &str) -> Result<(), Error> {
    if iface.len() >= libc::IFNAMSIZ as usize {
        return Err(Error::InterfaceNameTooLong(iface.to_owned()));
    }
    let iface_c = std::ffi::CString::new(iface).map_err(|_| Error::InterfaceNameTooLong(iface.to_owned()))?;
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            iface_c.as_ptr() as *const libc::c_void,
            iface_c.as_bytes_with_nul().len() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(())
}
