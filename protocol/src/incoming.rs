use std::collections::HashMap;

use crate::constants::{HEADER_SIZE, MAGIC_COOKIE};
use crate::option_tag::{overload, OptionTag};
use crate::{Error, Header};

/// An immutable parsed view of a received DHCP message.
///
/// Mirrors the `NDhcp4Incoming` contract: construct once from wire bytes,
/// then read the fixed header and query individual options by tag.
pub struct Incoming {
    header: Header,
    options: HashMap<u8, Vec<u8>>,
}

impl Incoming {
    pub fn new(bytes: &[u8]) -> Result<Self, Error> {
        let header = Header::parse(bytes)?;

        let cookie_start = HEADER_SIZE;
        if bytes.len() < cookie_start + MAGIC_COOKIE.len() {
            return Err(Error::Truncated(bytes.len()));
        }
        if bytes[cookie_start..cookie_start + MAGIC_COOKIE.len()] != MAGIC_COOKIE {
            return Err(Error::BadCookie);
        }

        let mut options = HashMap::new();
        let mut overload_mask = 0u8;
        Self::parse_options(
            &bytes[cookie_start + MAGIC_COOKIE.len()..],
            &mut options,
            &mut overload_mask,
        )?;

        // RFC 2131 §4.1: the `file`/`sname` fields may carry overflow
        // options if option 52 (OVERLOAD) said so.
        if overload_mask & overload::FILE != 0 {
            let mut discard = 0u8;
            Self::parse_options(&header.file, &mut options, &mut discard)?;
        }
        if overload_mask & overload::SNAME != 0 {
            let mut discard = 0u8;
            Self::parse_options(&header.sname, &mut options, &mut discard)?;
        }

        Ok(Incoming { header, options })
    }

    fn parse_options(
        buf: &[u8],
        out: &mut HashMap<u8, Vec<u8>>,
        overload_mask: &mut u8,
    ) -> Result<(), Error> {
        let mut i = 0;
        while i < buf.len() {
            let tag = buf[i];
            if tag == OptionTag::End as u8 {
                break;
            }
            if tag == OptionTag::Pad as u8 {
                i += 1;
                continue;
            }
            if i + 1 >= buf.len() {
                return Err(Error::OptionTruncated {
                    tag,
                    wanted: 1,
                    found: 0,
                });
            }
            let len = buf[i + 1] as usize;
            if i + 2 + len > buf.len() {
                return Err(Error::OptionTruncated {
                    tag,
                    wanted: len,
                    found: buf.len() - i - 2,
                });
            }
            let data = buf[i + 2..i + 2 + len].to_vec();
            if tag == OptionTag::Overload as u8 {
                if let Some(&bits) = data.first() {
                    *overload_mask |= bits;
                }
            }
            out.insert(tag, data);
            i += 2 + len;
        }
        Ok(())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the raw option bytes for `tag`, or `Error::NoData` if the
    /// message did not carry it (the `ENODATA` case of the C contract).
    pub fn query(&self, tag: u8) -> Result<&[u8], Error> {
        self.options
            .get(&tag)
            .map(|v| v.as_slice())
            .ok_or(Error::NoData(tag))
    }
}
