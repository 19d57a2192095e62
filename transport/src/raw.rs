//! The raw link-layer endpoint the connection core uses before it has an
//! IP address (INIT/PACKET/DRAINING states).
//!
//! Grounded on this codebase's `RawUdpSocketV4`: an `AF_PACKET`/`SOCK_DGRAM`
//! socket bound to one interface, with IPv4+UDP headers synthesised by hand
//! since `AF_PACKET` strips/reconstructs only the link-layer framing.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use mio::event::Source;
use mio::unix::SourceFd;
use mio::{Interest, Registry, Token};

use crate::{Error, RecvResult};

const ETH_P_IP: libc::c_int = 0x0800;
const DHCP_DEF_TTL: u8 = 64;
// Large enough for any DHCP message plus the IPv4/UDP headers.
const READ_BUF_LEN: usize = 1 << 16;
const IFNAMSIZ: usize = 16;

/// A non-blocking `AF_PACKET` datagram endpoint bound to one interface,
/// used to exchange full IPv4 UDP datagrams before the client has an
/// address of its own.
pub struct RawSocket {
    fd: RawFd,
    ifindex: libc::c_int,
    port: u16,
    read_buf: Vec<u8>,
    write_buf: Vec<u8>,
    /// Set by [`RawSocket::shutdown_send`]. `AF_PACKET` sockets have no
    /// kernel-level half-close, so the send side is closed in software.
    send_shutdown: bool,
}

impl RawSocket {
    /// Opens and binds a raw socket to `iface`, listening for IPv4 traffic
    /// addressed to `port`.
    pub fn open(iface: &str, port: u16) -> Result<Self, Error> {
        let ifindex = ifindex(iface)?;

        let fd = unsafe { libc::socket(libc::PF_PACKET, libc::SOCK_DGRAM, (ETH_P_IP as u16).to_be() as i32) };
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }

        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (ETH_P_IP as u16).to_be(),
            sll_ifindex: ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: 0,
            sll_addr: [0; 8],
        };
        let bind_result = unsafe {
            libc::bind(
                fd,
                &sockaddr as *const _ as *const libc::sockaddr,
                std::mem::size_of_val(&sockaddr) as libc::socklen_t,
            )
        };
        if bind_result < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err.into());
        }

        set_nonblocking(fd)?;

        Ok(RawSocket {
            fd,
            ifindex,
            port,
            read_buf: vec![0u8; READ_BUF_LEN],
            write_buf: vec![0u8; READ_BUF_LEN],
            send_shutdown: false,
        })
    }

    /// Broadcasts `payload` as a UDP datagram to `bhaddr` (the link-layer
    /// broadcast address), source `0.0.0.0:<port>`, destination
    /// `255.255.255.255:67`.
    pub fn send_broadcast(&mut self, bhaddr: &[u8], payload: &[u8]) -> Result<(), Error> {
        if self.send_shutdown {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "raw endpoint send side is shut down").into());
        }
        if bhaddr.len() > 8 {
            return Err(Error::HardwareAddressLengthMismatch(bhaddr.len(), 8));
        }

        let builder = etherparse::PacketBuilder::ipv4([0, 0, 0, 0], [255, 255, 255, 255], DHCP_DEF_TTL)
            .udp(self.port, crate::DHCP_PORT_SERVER);
        let packet_len = builder.size(payload.len());
        {
            let mut slice = &mut self.write_buf[..];
            builder
                .write(&mut slice, payload)
                .map_err(|_| Error::NotAnIpv4Datagram("failed to encode outgoing IPv4/UDP header"))?;
        }

        let mut sll_addr = [0u8; 8];
        sll_addr[..bhaddr.len()].copy_from_slice(bhaddr);
        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (ETH_P_IP as u16).to_be(),
            sll_ifindex: self.ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: bhaddr.len() as u8,
            sll_addr,
        };

        let sent = unsafe {
            libc::sendto(
                self.fd,
                self.write_buf.as_ptr() as *const libc::c_void,
                packet_len,
                0,
                &sockaddr as *const _ as *const libc::sockaddr,
                std::mem::size_of_val(&sockaddr) as u32,
            )
        };
        if sent < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    /// Reads one datagram. Returns [`RecvResult::WouldBlock`] if nothing is
    /// queued, [`RecvResult::NoMessage`] for a genuine zero-length
    /// datagram, or the payload length copied into `buf` otherwise.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult, Error> {
        loop {
            let n = unsafe {
                libc::read(
                    self.fd,
                    self.read_buf.as_mut_ptr() as *mut libc::c_void,
                    self.read_buf.len(),
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                if err.kind() == io::ErrorKind::WouldBlock {
                    return Ok(RecvResult::WouldBlock);
                }
                return Err(err.into());
            }
            let n = n as usize;
            if n == 0 {
                return Ok(RecvResult::NoMessage);
            }

            return match etherparse::SlicedPacket::from_ip(&self.read_buf[..n]) {
                Ok(etherparse::SlicedPacket {
                    ip: Some(etherparse::InternetSlice::Ipv4(_, _)),
                    transport: Some(etherparse::TransportSlice::Udp(udp)),
                    payload,
                    ..
                }) if udp.destination_port() == self.port => {
                    let len = payload.len().min(buf.len());
                    buf[..len].copy_from_slice(&payload[..len]);
                    Ok(RecvResult::Data(len))
                }
                _ => {
                    // Not a DHCP datagram for us; nothing to hand the
                    // caller this cycle, but the socket may still have
                    // more queued.
                    Ok(RecvResult::NoMessage)
                }
            };
        }
    }

    /// Disables further sends. Modelled in software since `AF_PACKET`
    /// sockets have no kernel half-close.
    pub fn shutdown_send(&mut self) {
        self.send_shutdown = true;
    }
}

impl crate::RawEndpoint for RawSocket {
    fn send_broadcast(&mut self, bhaddr: &[u8], payload: &[u8]) -> Result<(), Error> {
        RawSocket::send_broadcast(self, bhaddr, payload)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult, Error> {
        RawSocket::recv(self, buf)
    }

    fn shutdown_send(&mut self) {
        RawSocket::shutdown_send(self)
    }

    fn register(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        crate::register(registry, self, token)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        crate::deregister(registry, self)
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        if unsafe { libc::close(self.fd) } != 0 {
            log::warn!("closing raw socket: {}", io::Error::last_os_error());
        }
    }
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Source for RawSocket {
    fn register(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        SourceFd(&self.fd).register(registry, token, interests)
    }

    fn reregister(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        SourceFd(&self.fd).reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        SourceFd(&self.fd).deregister(registry)
    }
}

fn set_nonblocking(fd: RawFd) -> Result<(), Error> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error().into());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(())
}

#[repr(C)]
struct IfreqIndex {
    ifrn_name: [libc::c_char; IFNAMSIZ],
    ifindex: libc::c_int,
}

fn ifindex(iface: &str) -> Result<libc::c_int, Error> {
    if iface.len() >= IFNAMSIZ {
        return Err(Error::InterfaceNameTooLong(iface.to_owned()));
    }

    let mut ifreq = IfreqIndex {
        ifrn_name: [0; IFNAMSIZ],
        ifindex: 0,
    };
    for (dst, src) in ifreq.ifrn_name.iter_mut().zip(iface.bytes()) {
        *dst = src as libc::c_char;
    }

    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }
        let code = libc::ioctl(fd, libc::SIOCGIFINDEX, &mut ifreq);
        let err = io::Error::last_os_error();
        libc::close(fd);
        if code != 0 {
            return Err(err.into());
        }
    }
    Ok(ifreq.ifindex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlong_interface_name_is_rejected_before_any_syscall() {
        let name = "a".repeat(IFNAMSIZ);
        let err = ifindex(&name).unwrap_err();
        assert!(matches!(err, Error::InterfaceNameTooLong(got) if got == name));
    }

    #[test]
    fn send_broadcast_after_shutdown_is_rejected() {
        // Exercises the software-only half-close without touching a
        // socket: open() is skipped, the fd is faked with a closed one
        // so any accidental syscall fails loudly instead of hanging.
        let mut socket = RawSocket {
            fd: -1,
            ifindex: 0,
            port: 68,
            read_buf: vec![0u8; 16],
            write_buf: vec![0u8; 16],
            send_shutdown: true,
        };
        let err = socket.send_broadcast(&[0xff; 6], &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::NotConnected));
    }
}
