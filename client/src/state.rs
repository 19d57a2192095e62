/// The four-state transport machine from INIT through UDP.
///
/// Transitions are one-way: INIT -> PACKET -> DRAINING -> UDP. Modelled as
/// an explicit tagged enum rather than a pair of booleans so illegal
/// combinations (e.g. both endpoints closed while claiming DRAINING)
/// cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Init,
    Packet,
    Draining,
    Udp,
}

impl TransportState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            TransportState::Init => "INIT",
            TransportState::Packet => "PACKET",
            TransportState::Draining => "DRAINING",
            TransportState::Udp => "UDP",
        }
    }
}
