//! Registration against a host-supplied [`mio::Registry`].
//!
//! Both endpoint types implement [`mio::event::Source`] directly; these
//! free functions exist so the connection core in `dhcp4-client` registers
//! and deregisters either one under a single token without matching on
//! which concrete type it holds.

use std::io;

use mio::event::Source;
use mio::{Interest, Registry, Token};

/// Registers `source` for read-readiness under `token`.
pub fn register(registry: &Registry, source: &mut impl Source, token: Token) -> io::Result<()> {
    registry.register(source, token, Interest::READABLE)
}

/// Deregisters `source`. Safe to call on an endpoint that was never
/// registered only if the caller tracks that externally; `mio` itself
/// returns an error for an unknown source.
pub fn deregister(registry: &Registry, source: &mut impl Source) -> io::Result<()> {
    registry.deregister(source)
}
