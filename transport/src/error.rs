/// Errors raised by the raw link-layer and UDP endpoints.
///
/// `WouldBlock` is intercepted before it reaches the connection core and
/// turned into [`crate::RecvResult::WouldBlock`] instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("interface name {0:?} does not fit in IFNAMSIZ")]
    InterfaceNameTooLong(String),
    #[error("{0} is not a raw link-layer datagram (too short or wrong protocol)")]
    NotAnIpv4Datagram(&'static str),
    #[error("packet is addressed to hardware address length {0}, connection uses {1}")]
    HardwareAddressLengthMismatch(usize, usize),
}
