/// The fixed header's `op` field (RFC 2131 §2).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationCode {
    BootRequest = 1,
    BootReply = 2,
}

impl OperationCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(OperationCode::BootRequest),
            2 => Some(OperationCode::BootReply),
            _ => None,
        }
    }
}
