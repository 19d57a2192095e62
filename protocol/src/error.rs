/// Errors raised by the message codec.
///
/// This maps onto the *codec-error* kind of the connection core's error
/// design; the connection decides whether a codec error is fatal
/// (outbound) or swallowed (inbound, unless running in strict mode).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("DHCP message too short: {0} bytes")]
    Truncated(usize),
    #[error("DHCP message missing the magic cookie")]
    BadCookie,
    #[error("option {tag} truncated: wanted {wanted} bytes, found {found}")]
    OptionTruncated { tag: u8, wanted: usize, found: usize },
    #[error("option {0} not present")]
    NoData(u8),
    #[error("codec error: {0}")]
    Codec(String),
}
