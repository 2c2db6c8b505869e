//! Measurement and waveform retrieval, tagged with the pin and site each came from.

use crate::broadcast::Broadcast;
use crate::params::{ClearableMeasurement, FetchRelativeTo, MeasurementStats, ScalarMeasurement, Waveform};
use crate::scope::{ChannelAddress, SessionScopeAggregate};
use crate::sys::ScopeSession;
use crate::{ResolutionError, Result};

/// A fetched waveform together with the pin and site it was acquired from.
#[derive(Debug, Clone, PartialEq)]
pub struct PinWaveform {
    pub address: ChannelAddress,
    pub waveform: Waveform,
}

impl<S: ScopeSession, Q> SessionScopeAggregate<S, Q> {
    /// The latest result of `measurement` for every channel, in channel-list order.
    pub fn fetch_measurement(&self, measurement: ScalarMeasurement) -> Result<Vec<f64>> {
        let mut results = Vec::new();
        for entry in self {
            let stats = entry.session().fetch_measurement_stats(entry.channels(), measurement, Some(1))?;
            log::trace!("{:?} on {}: {:?}", measurement, entry.channel_list(), stats);
            results.extend(stats.iter().map(|stats| stats.result));
        }
        Ok(results)
    }

    pub fn fetch_waveform(&self, num_samples: usize) -> Result<Vec<PinWaveform>> {
        let mut tagged = Vec::new();
        for entry in self {
            let pairs = entry.pairs()?;
            let waveforms = entry.session().fetch(entry.channels(), num_samples,
                FetchRelativeTo::Pretrigger)?;
            log::debug!("fetched {} waveforms from {}", waveforms.len(), entry.channel_list());
            for waveform in waveforms {
                let (_, address) = pairs.iter()
                    .find(|(channel, _)| *channel == waveform.channel)
                    .ok_or_else(|| ResolutionError::UnknownChannel {
                        channel: waveform.channel.clone(),
                        channels: entry.channels().to_owned(),
                    })?;
                tagged.push(PinWaveform { address: address.parse()?, waveform });
            }
        }
        Ok(tagged)
    }

    /// Start a fresh acquisition on every entry and fetch statistics of `measurement` over it.
    ///
    /// Each entry is cleared, initiated and fetched before moving on to the next one, so the
    /// statistics never carry over from earlier acquisitions.
    pub fn measure_statistics(&self, measurement: ScalarMeasurement) -> Result<Vec<MeasurementStats>> {
        let mut results = Vec::new();
        for entry in self {
            log::debug!("measuring {:?} statistics on {}", measurement, entry.channel_list());
            let session = entry.session();
            session.clear_measurement_stats(entry.channels(), ClearableMeasurement::AllMeasurements)?;
            session.initiate()?;
            results.extend(session.fetch_measurement_stats(entry.channels(), measurement, None)?);
        }
        Ok(results)
    }

    pub fn clear_statistics(&self) -> Result<&Self> {
        for entry in self {
            entry.session().clear_measurement_stats(entry.channels(),
                ClearableMeasurement::AllMeasurements)?;
        }
        Ok(self)
    }
}

impl<S: ScopeSession + Clone, Q: Clone> SessionScopeAggregate<S, Q> {
    /// Fetch accumulated statistics channel by channel, with the measurement broadcast onto
    /// the channels.
    pub fn fetch_statistics_per_channel(&self, measurements: &Broadcast<ScalarMeasurement>)
            -> Result<Vec<MeasurementStats>> {
        let channels = self.per_channel()?;
        let measurements = measurements.expand(channels.len())?;
        let mut results = Vec::new();
        for (entry, measurement) in channels.iter().zip(measurements) {
            results.extend(entry.session().fetch_measurement_stats(entry.channels(), measurement, None)?);
        }
        Ok(results)
    }
}
