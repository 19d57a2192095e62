/// Errors raised by the connection core.
///
/// Wraps the lower crates' error types by `#[from]` conversion so callers
/// only need to match on one error type at the connection boundary.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid identity: {0}")]
    InvalidArgument(String),
    #[error("transport error: {0}")]
    Transport(#[from] dhcp4_transport::Error),
    #[error("codec error: {0}")]
    Codec(#[from] dhcp4_protocol::Error),
    #[error("{0} requires transport state {1}, connection is in {2}")]
    WrongState(&'static str, &'static str, &'static str),
}
