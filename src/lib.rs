//! Pin-to-channel resolution and grouped session operations for multi-site oscilloscope
//! test systems.
//!
//! A test program names *pins* (signals on the device under test, or system resources such as
//! clocks) and the sites it wants to test. [`Resolver`] turns that request into a
//! [`SessionScopeAggregate`]: one entry per physical instrument session, each with the channel
//! subset it owns and the site-qualified channel list aligned with it. Every configure, trigger,
//! acquire and fetch operation is then written once against the aggregate and applied uniformly,
//! regardless of how many sessions and channels sit behind it.

mod broadcast;
mod pins;
mod resolve;
mod scope;
mod terminal;
mod config;
mod params;
mod configure;
mod trigger;
mod acquire;
mod measure;
mod registry;

pub mod context;
pub mod sys;
pub mod pinmap;

pub use context::ContextError;
pub use sys::DriverError;

/// Failures to map the requested pins onto sessions and channels.
///
/// These are always fatal to the current request.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("{0:?} is neither a known pin nor a pin group")]
    UnresolvedPin(String),
    #[error("failed to expand pin group {group:?}")]
    PinGroupExpansion {
        group: String,
        #[source]
        source: ContextError,
    },
    #[error("channel group {channel_group} does not exist ({count} channel groups)")]
    ChannelGroupOutOfRange { channel_group: usize, count: usize },
    #[error("channel {channel} is outside of channel group {channel_group} (width {width})")]
    ChannelOutOfRange { channel_group: usize, channel: usize, width: usize },
    #[error("channel {channel} of channel group {channel_group} is claimed by both {existing:?} and {address:?}")]
    ChannelConflict { channel_group: usize, channel: usize, existing: String, address: String },
    #[error("channel {channel} of channel group {channel_group} was never assigned")]
    UnfilledChannel { channel_group: usize, channel: usize },
    #[error("site {0} is not an active site")]
    UnknownSite(u32),
    #[error("site {0} is requested more than once")]
    DuplicateSite(u32),
    #[error("{pins} pins were requested but the index table describes {table}")]
    PinCountMismatch { pins: usize, table: usize },
    #[error("pin {pin:?} has indices for {table} sites but {sites} sites were requested")]
    SiteCountMismatch { pin: String, sites: usize, table: usize },
    #[error("{sessions} sessions, {channels} channel subsets and {lists} channel lists do not line up")]
    SessionCountMismatch { sessions: usize, channels: usize, lists: usize },
    #[error("channel subset {channels:?} does not pair up with channel list {channel_list:?}")]
    ChannelCountMismatch { channels: String, channel_list: String },
    #[error("driver returned data for channel {channel:?}, which is not part of {channels:?}")]
    UnknownChannel { channel: String, channels: String },
    #[error("malformed channel address {0:?}")]
    MalformedAddress(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("pin map context: {0}")]
    Context(#[from] ContextError),
    #[error("resource name {0:?} does not identify a chassis")]
    UnknownChassis(String),
    #[error("unknown trigger routing {0:?}")]
    UnknownRouting(String),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

pub use broadcast::{Broadcast, BroadcastError};

pub use pins::{PinKind, ResolvedPin, PinRoster};

pub use resolve::{SessionSlotBuilder, Resolver, channel_lists, resolve};

pub use scope::{
    ChannelAddress,
    SessionScope,
    SessionScopeAggregate,
    split_list,
    split_channels,
    channel_list_to_pins,
};

pub use terminal::{OutputTerminal, TriggerSource, UnknownTerminal};

pub use config::{
    VerticalConfiguration,
    ChannelCharacteristics,
    HorizontalTiming,
    ReferenceLevels,
    ScopeConfiguration,
    PerChannelVertical,
};

pub use params::{
    VerticalCoupling,
    TriggerSlope,
    TriggerCoupling,
    TriggerModifier,
    RefLevelUnits,
    PercentageMethod,
    FetchRelativeTo,
    ScalarMeasurement,
    ClearableMeasurement,
    MeasurementStats,
    Waveform,
};

pub use configure::ScopeSessionProperties;

pub use trigger::TriggerRouting;

pub use measure::PinWaveform;

pub use registry::{initialize_sessions, close_sessions};
