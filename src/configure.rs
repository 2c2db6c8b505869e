//! Vertical, horizontal and reference-level setup of every session in an aggregate.

use crate::config::{
    ChannelCharacteristics, HorizontalTiming, PerChannelVertical, ReferenceLevels,
    ScopeConfiguration, VerticalConfiguration,
};
use crate::params::{TriggerSlope, VerticalCoupling};
use crate::scope::SessionScopeAggregate;
use crate::sys::ScopeSession;
use crate::Result;

/// A snapshot of the settings of one aggregate entry, as reported by its session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopeSessionProperties {
    pub instrument_name: String,
    pub channels: String,
    pub channel_list: String,
    pub vertical_range: f64,
    pub coupling: VerticalCoupling,
    pub probe_attenuation: f64,
    pub sample_rate: f64,
    pub input_impedance: f64,
    pub trigger_source: String,
    pub trigger_slope: TriggerSlope,
}

impl<S: ScopeSession, Q> SessionScopeAggregate<S, Q> {
    /// Apply vertical, channel and timing settings to every entry.
    pub fn configure(&self, configuration: &ScopeConfiguration) -> Result<&Self> {
        for entry in self {
            log::debug!("configuring channels {} ({})", entry.channels(), entry.channel_list());
            entry.session().configure_vertical(entry.channels(), &configuration.vertical)?;
            entry.session().configure_chan_characteristics(entry.channels(),
                &configuration.characteristics)?;
            entry.session().configure_horizontal_timing(&configuration.timing)?;
        }
        Ok(self)
    }

    pub fn configure_vertical(&self, vertical: &VerticalConfiguration) -> Result<&Self> {
        for entry in self {
            log::debug!("configuring vertical {:?} on channels {}", vertical, entry.channels());
            entry.session().configure_vertical(entry.channels(), vertical)?;
        }
        Ok(self)
    }

    /// Set the input impedance, leaving the bandwidth limit at the driver default.
    pub fn configure_impedance(&self, input_impedance: f64) -> Result<&Self> {
        let characteristics = ChannelCharacteristics { input_impedance, max_input_frequency: -1.0 };
        for entry in self {
            log::debug!("configuring {} ohm input on channels {}", input_impedance, entry.channels());
            entry.session().configure_chan_characteristics(entry.channels(), &characteristics)?;
        }
        Ok(self)
    }

    /// Measure timing relative to the 50% point between base and top.
    pub fn configure_reference_level(&self) -> Result<&Self> {
        let levels = ReferenceLevels::default();
        for entry in self {
            entry.session().configure_ref_levels(entry.channels(), &levels)?;
        }
        Ok(self)
    }

    pub fn configure_timing(&self, timing: &HorizontalTiming) -> Result<&Self> {
        for entry in self {
            log::debug!("configuring timing {:?} on {}", timing, entry.channel_list());
            entry.session().configure_horizontal_timing(timing)?;
        }
        Ok(self)
    }

    pub fn session_properties(&self) -> Result<Vec<ScopeSessionProperties>> {
        let mut properties = Vec::with_capacity(self.len());
        for entry in self {
            let session = entry.session();
            let vertical = session.vertical(entry.channels())?;
            let characteristics = session.chan_characteristics(entry.channels())?;
            properties.push(ScopeSessionProperties {
                instrument_name: session.resource_name()?,
                channels: entry.channels().to_owned(),
                channel_list: entry.channel_list().to_owned(),
                vertical_range: vertical.range,
                coupling: vertical.coupling,
                probe_attenuation: vertical.probe_attenuation,
                sample_rate: session.horizontal_sample_rate()?,
                input_impedance: characteristics.input_impedance,
                trigger_source: session.trigger_source()?,
                trigger_slope: session.trigger_slope()?,
            });
        }
        Ok(properties)
    }
}

impl<S: ScopeSession + Clone, Q: Clone> SessionScopeAggregate<S, Q> {
    /// Apply vertical settings channel by channel.
    ///
    /// Every parameter is broadcast onto the channels of the aggregate first; nothing is sent
    /// to a session unless all of them fit.
    pub fn configure_vertical_per_channel(&self, settings: &PerChannelVertical) -> Result<&Self> {
        let channels = self.per_channel()?;
        let count = channels.len();
        let ranges = settings.range.expand(count)?;
        let offsets = settings.offset.expand(count)?;
        let couplings = settings.coupling.expand(count)?;
        let attenuations = settings.probe_attenuation.expand(count)?;
        let enabled = settings.enabled.expand(count)?;
        for (index, entry) in channels.iter().enumerate() {
            let vertical = VerticalConfiguration {
                range: ranges[index],
                offset: offsets[index],
                coupling: couplings[index],
                probe_attenuation: attenuations[index],
                enabled: enabled[index],
            };
            log::trace!("configuring {} on channel {}: {:?}",
                entry.channel_list(), entry.channels(), vertical);
            entry.session().configure_vertical(entry.channels(), &vertical)?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::broadcast::{Broadcast, BroadcastError};
    use crate::pinmap::test::scope;
    use crate::sys::sim::{Call, Journal};
    use crate::Error;

    fn vertical_calls(journal: &Journal) -> Vec<(String, String, f64)> {
        journal.events().into_iter()
            .filter_map(|event| match event.call {
                Call::ConfigureVertical { channels, vertical } =>
                    Some((event.session, channels, vertical.range)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_configure() {
        let journal = Journal::new();
        let scope = scope(&journal, &["G1"]);
        scope.configure(&ScopeConfiguration::default()).unwrap();
        assert_eq!(journal.calls("Scope_C1_S02"), [
            Call::ConfigureVertical { channels: "0,1".into(), vertical: VerticalConfiguration::default() },
            Call::ConfigureChanCharacteristics {
                channels: "0,1".into(),
                characteristics: ChannelCharacteristics::default(),
            },
            Call::ConfigureHorizontalTiming(HorizontalTiming::default()),
        ]);
        assert_eq!(journal.calls("Scope_C1_S03").len(), 3);
        assert!(journal.calls("Scope_C2_S02").is_empty());
    }

    #[test]
    fn test_configure_impedance() {
        let journal = Journal::new();
        let scope = scope(&journal, &["Clk"]);
        scope.configure_impedance(50.0).unwrap()
            .configure_reference_level().unwrap();
        assert_eq!(journal.calls("Scope_C2_S02"), [
            Call::ConfigureChanCharacteristics {
                channels: "1".into(),
                characteristics: ChannelCharacteristics { input_impedance: 50.0, max_input_frequency: -1.0 },
            },
            Call::ConfigureRefLevels { channels: "1".into(), levels: ReferenceLevels::default() },
        ]);
    }

    #[test]
    fn test_vertical_per_channel() {
        let journal = Journal::new();
        let scope = scope(&journal, &["G1"]);
        let settings = PerChannelVertical { range: Broadcast::from([1.0, 2.0]), ..Default::default() };
        scope.configure_vertical_per_channel(&settings).unwrap();
        assert_eq!(vertical_calls(&journal), [
            ("Scope_C1_S02".to_owned(), "0".to_owned(), 1.0),
            ("Scope_C1_S02".to_owned(), "1".to_owned(), 2.0),
            ("Scope_C1_S03".to_owned(), "0".to_owned(), 1.0),
            ("Scope_C1_S03".to_owned(), "1".to_owned(), 2.0),
        ]);
    }

    #[test]
    fn test_vertical_per_channel_uneven() {
        let journal = Journal::new();
        let scope = scope(&journal, &["G1"]);
        let settings = PerChannelVertical {
            enabled: Broadcast::from([true, false, true]),
            ..Default::default()
        };
        assert!(matches!(scope.configure_vertical_per_channel(&settings),
            Err(Error::Broadcast(BroadcastError::Uneven { len: 3, count: 4 }))));
        assert!(journal.events().is_empty());
    }

    #[test]
    fn test_session_properties() {
        let journal = Journal::new();
        let scope = scope(&journal, &["A"]);
        scope.configure_vertical(&VerticalConfiguration {
            range: 2.0,
            coupling: VerticalCoupling::AC,
            probe_attenuation: 10.0,
            ..Default::default()
        }).unwrap();
        let properties = scope.session_properties().unwrap();
        assert_eq!(properties, [ScopeSessionProperties {
            instrument_name: "Scope_C1_S02".into(),
            channels: "0,1".into(),
            channel_list: "Site0/A,Site1/A".into(),
            vertical_range: 2.0,
            coupling: VerticalCoupling::AC,
            probe_attenuation: 10.0,
            sample_rate: 10e6,
            input_impedance: 1e6,
            trigger_source: "VAL_IMMEDIATE".into(),
            trigger_slope: TriggerSlope::Positive,
        }]);
    }
}
