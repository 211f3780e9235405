/// One feasible internal transition through a component: a signal entering
/// on `in_port`/`in_channel` can be switched out on `out_port`/`out_channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableConnection {
    pub in_port: String,
    pub in_channel: u32,
    pub out_port: String,
    pub out_channel: u32,
}

impl AvailableConnection {
    pub fn to_line(&self) -> String {
        format!("{} {} {} {}", self.in_port, self.in_channel, self.out_port, self.out_channel)
    }
}

/// Counters from one component's enumeration run, surfaced for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub candidate_port_pairs: usize,
    pub cut_count: usize,
}
