//! Interfaces of the test-management context that owns the pin map and the instrument sessions.

use crate::sys::ScopeSession;

/// A failure reported by the test-management context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ContextError(pub String);

impl ContextError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Which channel group (session) and which position within it a pin occupies at one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPosition {
    pub channel_group: usize,
    pub channel: usize,
}

/// Channel placement of a list of pins across the active sites.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelIndexTable {
    /// Width of every channel group, in the order of the sessions returned with it.
    pub pins_per_channel_group: Vec<usize>,
    /// Indexed as `positions[pin][k]`, where `k` is the position of the site in the site list
    /// the table was requested for.
    pub positions: Vec<Vec<ChannelPosition>>,
}

/// Result of asking the context which sessions serve a set of pins.
#[derive(Debug, Clone)]
pub struct SessionAssignment<S, Q> {
    pub pin_query_context: Q,
    pub sessions: Vec<S>,
    /// Channel subset owned by the request on each session, e.g. `"0,1"`.
    pub channels: Vec<String>,
}

pub trait PinQueryContext {
    /// Placement of `pins` at each of `sites`, one column per site in the order given.
    fn channel_group_and_channel_index(&self, pins: &[String], sites: &[u32])
        -> Result<ChannelIndexTable, ContextError>;
}

pub trait PinMapContext {
    type Session: ScopeSession;
    type PinQuery: PinQueryContext;

    /// All DUT pins and all system pins, in pin map order.
    fn pin_names(&self) -> Result<(Vec<String>, Vec<String>), ContextError>;

    /// Member pins of the named pin groups. Names that are already pins pass through.
    fn pins_in_pin_group(&self, names: &[String]) -> Result<Vec<String>, ContextError>;

    /// Sessions and channel subsets serving `pins` at `sites`.
    fn pins_to_sessions(&self, pins: &[String], sites: &[u32])
        -> Result<SessionAssignment<Self::Session, Self::PinQuery>, ContextError>;

    /// Every site the test program runs on.
    fn site_numbers(&self) -> Vec<u32>;
}

pub trait SessionRegistry {
    type Session;

    fn instrument_names(&self) -> Result<Vec<String>, ContextError>;
    fn set_session(&mut self, instrument_name: &str, session: Self::Session) -> Result<(), ContextError>;
    fn sessions(&self) -> Result<Vec<Self::Session>, ContextError>;
}
