//! The seam between the operation layer and an oscilloscope driver.

use crate::config::{ChannelCharacteristics, HorizontalTiming, ReferenceLevels, VerticalConfiguration};
use crate::params::{
    ClearableMeasurement, FetchRelativeTo, MeasurementStats, ScalarMeasurement, TriggerCoupling,
    TriggerModifier, TriggerSlope, Waveform,
};
use crate::terminal::OutputTerminal;

pub mod sim;

/// A status reported by the driver. Passed through to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{description} (driver status {code})")]
pub struct DriverError {
    pub code: i32,
    pub description: String,
}

impl DriverError {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        DriverError { code, description: description.into() }
    }
}

pub type Result<T> = core::result::Result<T, DriverError>;

/// One open handle to a physical oscilloscope.
///
/// Methods take `&self`: a session is a handle onto state that lives in the driver, and every
/// call mutates that state with no locking. `channels` arguments are channel-subset
/// descriptors such as `"0"` or `"0,1"`.
pub trait ScopeSession {
    /// Resource name the session was opened with, e.g. `"PXI1Slot2"`.
    fn resource_name(&self) -> Result<String>;
    /// Number of input channels the instrument has.
    fn num_channels(&self) -> Result<usize>;

    fn configure_vertical(&self, channels: &str, vertical: &VerticalConfiguration) -> Result<()>;
    fn configure_chan_characteristics(&self, channels: &str, characteristics: &ChannelCharacteristics)
        -> Result<()>;
    fn configure_horizontal_timing(&self, timing: &HorizontalTiming) -> Result<()>;
    fn configure_ref_levels(&self, channels: &str, levels: &ReferenceLevels) -> Result<()>;

    fn configure_trigger_immediate(&self) -> Result<()>;
    fn configure_trigger_digital(&self, source: &str, slope: TriggerSlope, holdoff: f64, delay: f64)
        -> Result<()>;
    fn configure_trigger_edge(&self, source: &str, level: f64, coupling: TriggerCoupling,
                              slope: TriggerSlope, holdoff: f64, delay: f64) -> Result<()>;
    fn set_trigger_modifier(&self, modifier: TriggerModifier) -> Result<()>;
    fn set_exported_start_trigger(&self, terminal: OutputTerminal) -> Result<()>;

    fn initiate(&self) -> Result<()>;
    fn abort(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    /// Reset the session attributes to their defaults.
    fn reset(&self) -> Result<()>;
    /// Reset the whole device, including state that `reset` keeps.
    fn reset_device(&self) -> Result<()>;
    fn close(&self) -> Result<()>;

    fn clear_measurement_stats(&self, channels: &str, which: ClearableMeasurement) -> Result<()>;
    /// Statistics for each channel and record. `num_records` defaults to the configured count.
    fn fetch_measurement_stats(&self, channels: &str, measurement: ScalarMeasurement,
                               num_records: Option<usize>) -> Result<Vec<MeasurementStats>>;
    fn fetch(&self, channels: &str, num_samples: usize, relative_to: FetchRelativeTo)
        -> Result<Vec<Waveform>>;

    fn vertical(&self, channels: &str) -> Result<VerticalConfiguration>;
    fn chan_characteristics(&self, channels: &str) -> Result<ChannelCharacteristics>;
    fn horizontal_sample_rate(&self) -> Result<f64>;
    fn trigger_source(&self) -> Result<String>;
    fn trigger_slope(&self) -> Result<TriggerSlope>;
}
