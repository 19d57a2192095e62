use crate::constants::{HEADER_SIZE, MAGIC_COOKIE};
use crate::option_tag::OptionTag;
use crate::{Error, Header};

/// A DHCP message under construction.
///
/// Mirrors the `NDhcp4Outgoing` contract this crate's connection core was
/// specified against: a mutable fixed header plus an append-only option
/// list, serialised to wire bytes on demand via [`Outgoing::raw`].
pub struct Outgoing {
    header: Header,
    /// `OVERLOAD` bits the caller declared usable for option spill-over.
    /// Spill-over itself is out of scope for this codec (see DESIGN.md);
    /// the mask is recorded only so callers that rely on it get a clear
    /// "unsupported" error rather than silently truncated options.
    overload: u8,
    options: Vec<u8>,
}

impl Outgoing {
    /// Creates a message with a zeroed header and `secs` pre-filled.
    pub fn new(secs: u16, overload: u8) -> Self {
        let mut header = Header::zeroed();
        header.secs = secs;
        Outgoing {
            header,
            overload,
            options: Vec::new(),
        }
    }

    pub fn header(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn header_ref(&self) -> &Header {
        &self.header
    }

    /// Appends a `tag, len, data` option. Fails if `data` cannot fit in a
    /// single option (255 bytes) or spills past the plain option area
    /// without declared overload capacity.
    pub fn append(&mut self, tag: u8, data: &[u8]) -> Result<(), Error> {
        if data.len() > u8::MAX as usize {
            return Err(Error::Codec(format!(
                "option {} is {} bytes, longer than a single option can carry",
                tag,
                data.len()
            )));
        }
        if self.options.len() + data.len() + 2 > 312 && self.overload == 0 {
            return Err(Error::Codec(format!(
                "option {} would overflow the option area and no overload space was requested",
                tag
            )));
        }
        self.options.push(tag);
        self.options.push(data.len() as u8);
        self.options.extend_from_slice(data);
        Ok(())
    }

    /// Serialises the header, magic cookie, options and terminating `End`
    /// option into wire bytes.
    pub fn raw(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + MAGIC_COOKIE.len() + self.options.len() + 1);
        self.header.write_to(&mut buf);
        buf.extend_from_slice(&MAGIC_COOKIE);
        buf.extend_from_slice(&self.options);
        buf.push(OptionTag::End as u8);
        buf
    }
}
