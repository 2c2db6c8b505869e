//! Driver-level enumerations and data records exchanged with scope sessions.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VerticalCoupling {
    AC,
    #[default]
    DC,
    Ground,
}

impl fmt::Display for VerticalCoupling {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::AC => "AC",
            Self::DC => "DC",
            Self::Ground => "Ground",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerSlope {
    Negative,
    #[default]
    Positive,
}

impl fmt::Display for TriggerSlope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Negative => "Negative",
            Self::Positive => "Positive",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerCoupling {
    AC,
    #[default]
    DC,
    HfReject,
    LfReject,
    AcPlusHfReject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerModifier {
    #[default]
    NoTriggerMod,
    Auto,
    AutoLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefLevelUnits {
    Volts,
    #[default]
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PercentageMethod {
    LowHigh,
    MinMax,
    #[default]
    BaseTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRelativeTo {
    ReadPointer,
    Pretrigger,
    Now,
    Start,
    Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarMeasurement {
    Frequency,
    Period,
    VoltageRms,
    VoltagePeakToPeak,
    VoltageMax,
    VoltageMin,
    VoltageAverage,
    VoltageAmplitude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearableMeasurement {
    AllMeasurements,
    Scalar(ScalarMeasurement),
}

/// Statistics the instrument accumulates for one measurement on one channel and record.
///
/// `num_in_stats` keeps growing across acquisitions until the accumulator is cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasurementStats {
    pub result: f64,
    pub mean: f64,
    pub stdev: f64,
    pub min_val: f64,
    pub max_val: f64,
    pub num_in_stats: usize,
}

/// One record of one channel, as fetched from a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub channel: String,
    pub record: usize,
    pub relative_initial_x: f64,
    pub x_increment: f64,
    pub samples: Vec<f64>,
}
