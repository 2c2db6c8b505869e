//! High-level configuration of the sessions behind an aggregate in terms of physical qualities.

use crate::broadcast::Broadcast;
use crate::params::{PercentageMethod, RefLevelUnits, VerticalCoupling};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VerticalConfiguration {
    /// Peak-to-peak input range in volts, at the probe tip.
    pub range: f64,
    pub offset: f64,
    pub coupling: VerticalCoupling,
    /// Probe attenuation as a ratio. For a 1X probe, `1.0`; for a 10X probe, `10.0`.
    pub probe_attenuation: f64,
    pub enabled: bool,
}

impl Default for VerticalConfiguration {
    fn default() -> Self {
        Self {
            range: 5.0,
            offset: 0.0,
            coupling: VerticalCoupling::DC,
            probe_attenuation: 1.0,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChannelCharacteristics {
    /// Input impedance in ohms; `50.0` or `1e6`.
    pub input_impedance: f64,
    /// Bandwidth limit in hertz. `0.0` selects full bandwidth, `-1.0` the driver default.
    pub max_input_frequency: f64,
}

impl Default for ChannelCharacteristics {
    fn default() -> Self {
        Self {
            input_impedance: 1e6,
            max_input_frequency: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HorizontalTiming {
    pub min_sample_rate: f64,
    pub min_record_length: usize,
    /// Position of the trigger within the record, in percent.
    pub ref_position: f64,
    pub num_records: usize,
    pub enforce_realtime: bool,
}

impl Default for HorizontalTiming {
    fn default() -> Self {
        Self {
            min_sample_rate: 10e6,
            min_record_length: 1000,
            ref_position: 0.0,
            num_records: 1,
            enforce_realtime: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReferenceLevels {
    pub units: RefLevelUnits,
    pub mid: f64,
    pub method: PercentageMethod,
}

impl Default for ReferenceLevels {
    fn default() -> Self {
        Self {
            units: RefLevelUnits::Percentage,
            mid: 50.0,
            method: PercentageMethod::BaseTop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScopeConfiguration {
    pub vertical: VerticalConfiguration,
    pub characteristics: ChannelCharacteristics,
    pub timing: HorizontalTiming,
}

/// Vertical settings applied channel by channel, in channel-list order.
///
/// Each field is broadcast independently onto the channels of the aggregate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerChannelVertical {
    pub range: Broadcast<f64>,
    pub offset: Broadcast<f64>,
    pub coupling: Broadcast<VerticalCoupling>,
    pub probe_attenuation: Broadcast<f64>,
    pub enabled: Broadcast<bool>,
}

impl Default for PerChannelVertical {
    fn default() -> Self {
        let vertical = VerticalConfiguration::default();
        Self {
            range: Broadcast::One(vertical.range),
            offset: Broadcast::One(vertical.offset),
            coupling: Broadcast::One(vertical.coupling),
            probe_attenuation: Broadcast::One(vertical.probe_attenuation),
            enabled: Broadcast::One(vertical.enabled),
        }
    }
}
