//! Wire constants used by the fixed DHCP/BOOTP header and the option
//! space. See RFC 2131 §2 and §3, and RFC 2132 for the option codes.

/// UDP port the client listens on.
pub const DHCP_PORT_CLIENT: u16 = 68;
/// UDP port the server listens on.
pub const DHCP_PORT_SERVER: u16 = 67;

/// Fixed-size portion of the DHCP header, not counting the magic cookie
/// or options (RFC 2131 §2).
pub const HEADER_SIZE: usize = 236;
/// `chaddr` field width.
pub const CHADDR_LEN: usize = 16;
/// `sname` field width.
pub const SNAME_LEN: usize = 64;
/// `file` field width.
pub const FILE_LEN: usize = 128;

/// RFC 1497 magic cookie that precedes the option space.
pub const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

/// The largest message the implementation will ever advertise for the
/// connected-UDP path (well under the Ethernet MTU).
pub const UDP_MAX_MESSAGE_SIZE: u16 = 1472;

/// The BROADCAST bit of the header's `flags` field.
pub const FLAG_BROADCAST: u16 = 0x8000;
