use crate::constants::{CHADDR_LEN, FILE_LEN, FLAG_BROADCAST, HEADER_SIZE, SNAME_LEN};
use crate::{Error, HardwareType, OperationCode};

/// The fixed 236-byte BOOTP/DHCP header (RFC 2131 §2), independent of the
/// option space that follows the magic cookie.
#[derive(Clone, Debug)]
pub struct Header {
    pub op: OperationCode,
    pub htype: HardwareType,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: [u8; 4],
    pub yiaddr: [u8; 4],
    pub siaddr: [u8; 4],
    pub giaddr: [u8; 4],
    pub chaddr: [u8; CHADDR_LEN],
    pub sname: [u8; SNAME_LEN],
    pub file: [u8; FILE_LEN],
}

impl Header {
    pub(crate) fn zeroed() -> Self {
        Header {
            op: OperationCode::BootRequest,
            htype: HardwareType::Ethernet,
            hlen: 0,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: [0; 4],
            yiaddr: [0; 4],
            siaddr: [0; 4],
            giaddr: [0; 4],
            chaddr: [0; CHADDR_LEN],
            sname: [0; SNAME_LEN],
            file: [0; FILE_LEN],
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.flags & FLAG_BROADCAST != 0
    }

    pub fn set_broadcast(&mut self, value: bool) {
        if value {
            self.flags |= FLAG_BROADCAST;
        } else {
            self.flags &= !FLAG_BROADCAST;
        }
    }

    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(self.op as u8);
        buf.push(u8::from(self.htype));
        buf.push(self.hlen);
        buf.push(self.hops);
        buf.extend_from_slice(&self.xid.to_be_bytes());
        buf.extend_from_slice(&self.secs.to_be_bytes());
        buf.extend_from_slice(&self.flags.to_be_bytes());
        buf.extend_from_slice(&self.ciaddr);
        buf.extend_from_slice(&self.yiaddr);
        buf.extend_from_slice(&self.siaddr);
        buf.extend_from_slice(&self.giaddr);
        buf.extend_from_slice(&self.chaddr);
        buf.extend_from_slice(&self.sname);
        buf.extend_from_slice(&self.file);
    }

    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Truncated(bytes.len()));
        }

        let op = OperationCode::from_u8(bytes[0])
            .ok_or_else(|| Error::Codec(format!("invalid op code {}", bytes[0])))?;
        let htype = HardwareType::from(bytes[1]);
        let hlen = bytes[2];
        let hops = bytes[3];
        let xid = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        let secs = u16::from_be_bytes(bytes[8..10].try_into().unwrap());
        let flags = u16::from_be_bytes(bytes[10..12].try_into().unwrap());
        let ciaddr = bytes[12..16].try_into().unwrap();
        let yiaddr = bytes[16..20].try_into().unwrap();
        let siaddr = bytes[20..24].try_into().unwrap();
        let giaddr = bytes[24..28].try_into().unwrap();
        let chaddr = bytes[28..28 + CHADDR_LEN].try_into().unwrap();
        let sname = bytes[44..44 + SNAME_LEN].try_into().unwrap();
        let file = bytes[108..108 + FILE_LEN].try_into().unwrap();

        Ok(Header {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
        })
    }
}
