//! A pin map held in memory, serving as the test-management context for simulated test runs.
//!
//! The pin map lists the DUT and system pins, the pin groups, the sites, the instruments and
//! which instrument channel every pin is connected to at every site. [`TestContext`] answers
//! the pin map queries of [`PinMapContext`] from it and keeps the session registry.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::context::{
    ChannelIndexTable, ChannelPosition, ContextError, PinMapContext, PinQueryContext,
    SessionAssignment, SessionRegistry,
};
use crate::sys::sim::{Journal, SimulatedSession, STATUS_RESOURCE_NOT_FOUND};
use crate::sys::{DriverError, ScopeSession};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instrument {
    pub name: String,
    pub channel_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    pub pin: String,
    /// `None` for system pins.
    pub site: Option<u32>,
    pub instrument: String,
    pub channel: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PinMap {
    pub dut_pins: Vec<String>,
    pub system_pins: Vec<String>,
    pub pin_groups: BTreeMap<String, Vec<String>>,
    pub sites: Vec<u32>,
    pub instruments: Vec<Instrument>,
    pub connections: Vec<Connection>,
}

impl PinMap {
    #[cfg(feature = "serde")]
    pub fn from_toml(text: &str) -> Result<PinMap, ContextError> {
        let map: PinMap = toml::from_str(text)
            .map_err(|error| ContextError::new(format!("invalid pin map: {}", error)))?;
        map.validate()?;
        Ok(map)
    }

    /// Build a context with a simulated session opened and initialized for every instrument.
    pub fn into_context(self, journal: &Journal, options: &str)
            -> crate::Result<TestContext<SimulatedSession>> {
        let channel_counts = self.instruments.iter()
            .map(|instrument| (instrument.name.clone(), instrument.channel_count))
            .collect::<BTreeMap<_, _>>();
        let mut context = TestContext::new(self)?;
        crate::initialize_sessions(&mut context, |name, _options| {
            let channel_count = channel_counts.get(name).copied().ok_or_else(||
                DriverError::new(STATUS_RESOURCE_NOT_FOUND, format!("{} not found", name)))?;
            Ok(SimulatedSession::new(name, channel_count, journal))
        }, options)?;
        Ok(context)
    }

    fn is_dut_pin(&self, name: &str) -> bool {
        self.dut_pins.iter().any(|pin| pin == name)
    }

    fn is_system_pin(&self, name: &str) -> bool {
        self.system_pins.iter().any(|pin| pin == name)
    }

    fn is_pin(&self, name: &str) -> bool {
        self.is_dut_pin(name) || self.is_system_pin(name)
    }

    fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|instrument| instrument.name == name)
    }

    fn connection(&self, pin: &str, site: u32) -> Result<&Connection, ContextError> {
        let site = if self.is_system_pin(pin) { None } else { Some(site) };
        self.connections.iter()
            .find(|connection| connection.pin == pin && connection.site == site)
            .ok_or_else(|| match site {
                Some(site) => ContextError::new(format!("pin {} is not connected at site {}", pin, site)),
                None => ContextError::new(format!("system pin {} is not connected", pin)),
            })
    }

    /// Every connection of `pin` that `sites` use.
    fn connections_of(&self, pin: &str, sites: &[u32]) -> Result<Vec<&Connection>, ContextError> {
        if self.is_system_pin(pin) {
            // the site argument is ignored for system pins
            Ok(vec![self.connection(pin, 0)?])
        } else {
            sites.iter().map(|&site| self.connection(pin, site)).collect()
        }
    }

    fn expand(&self, name: &str) -> Vec<String> {
        match self.pin_groups.get(name) {
            Some(members) => members.clone(),
            None if self.is_pin(name) => vec![name.to_owned()],
            None => Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        let mut used = BTreeSet::new();
        for connection in &self.connections {
            let Connection { pin, site, instrument, channel } = connection;
            let instrument = self.instrument(instrument).ok_or_else(||
                ContextError::new(format!("pin {} is connected to unknown instrument {}", pin, instrument)))?;
            if *channel >= instrument.channel_count {
                return Err(ContextError::new(format!(
                    "pin {} is connected to channel {} of {}, which has {} channels",
                    pin, channel, instrument.name, instrument.channel_count)))
            }
            match site {
                None if !self.is_system_pin(pin) =>
                    return Err(ContextError::new(format!("DUT pin {} is connected without a site", pin))),
                Some(_) if !self.is_dut_pin(pin) =>
                    return Err(ContextError::new(format!("{} is not a DUT pin", pin))),
                Some(site) if !self.sites.contains(site) =>
                    return Err(ContextError::new(format!("pin {} is connected at unknown site {}", pin, site))),
                _ => ()
            }
            if !used.insert((instrument.name.as_str(), *channel)) {
                return Err(ContextError::new(format!(
                    "channel {} of {} is connected more than once", channel, instrument.name)))
            }
        }
        for (group, members) in &self.pin_groups {
            if let Some(member) = members.iter().find(|member| !self.is_pin(member)) {
                return Err(ContextError::new(format!("pin group {} contains unknown pin {}", group, member)))
            }
        }
        Ok(())
    }
}

/// Placement of one session request: the instruments it touches and the channels it owns on
/// each, in channel group order.
#[derive(Debug, Clone)]
pub struct PinQuery {
    map: Rc<PinMap>,
    channel_groups: Vec<(String, Vec<usize>)>,
}

impl PinQueryContext for PinQuery {
    fn channel_group_and_channel_index(&self, pins: &[String], sites: &[u32])
            -> Result<ChannelIndexTable, ContextError> {
        let mut positions = Vec::with_capacity(pins.len());
        for pin in pins {
            if !self.map.is_pin(pin) {
                return Err(ContextError::new(format!("{} is not a pin", pin)))
            }
            let row = sites.iter()
                .map(|&site| -> Result<ChannelPosition, ContextError> {
                    let connection = self.map.connection(pin, site)?;
                    let (channel_group, (_, channels)) = self.channel_groups.iter().enumerate()
                        .find(|(_, (instrument, _))| *instrument == connection.instrument)
                        .ok_or_else(|| ContextError::new(format!("pin {} is not part of this request", pin)))?;
                    let channel = channels.iter().position(|&channel| channel == connection.channel)
                        .ok_or_else(|| ContextError::new(format!("pin {} is not part of this request", pin)))?;
                    Ok(ChannelPosition { channel_group, channel })
                })
                .collect::<Result<Vec<_>, _>>()?;
            positions.push(row);
        }
        Ok(ChannelIndexTable {
            pins_per_channel_group: self.channel_groups.iter().map(|(_, channels)| channels.len()).collect(),
            positions,
        })
    }
}

/// Test-management context backed by a [`PinMap`].
#[derive(Debug)]
pub struct TestContext<S> {
    map: Rc<PinMap>,
    sessions: BTreeMap<String, S>,
}

impl<S> TestContext<S> {
    pub fn new(map: PinMap) -> Result<TestContext<S>, ContextError> {
        map.validate()?;
        Ok(TestContext { map: Rc::new(map), sessions: BTreeMap::new() })
    }

    pub fn pin_map(&self) -> &PinMap {
        &self.map
    }

    pub fn session(&self, instrument_name: &str) -> Option<&S> {
        self.sessions.get(instrument_name)
    }
}

impl<S: ScopeSession + Clone> PinMapContext for TestContext<S> {
    type Session = S;
    type PinQuery = PinQuery;

    fn pin_names(&self) -> Result<(Vec<String>, Vec<String>), ContextError> {
        Ok((self.map.dut_pins.clone(), self.map.system_pins.clone()))
    }

    fn pins_in_pin_group(&self, names: &[String]) -> Result<Vec<String>, ContextError> {
        Ok(names.iter().flat_map(|name| self.map.expand(name)).collect())
    }

    fn pins_to_sessions(&self, pins: &[String], sites: &[u32])
            -> Result<SessionAssignment<S, PinQuery>, ContextError> {
        let mut used: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
        for name in pins {
            let members = self.map.expand(name);
            if members.is_empty() {
                return Err(ContextError::new(format!("{} is neither a pin nor a pin group", name)))
            }
            for member in members {
                for connection in self.map.connections_of(&member, sites)? {
                    used.entry(connection.instrument.as_str()).or_default().insert(connection.channel);
                }
            }
        }
        let mut channel_groups = Vec::new();
        let mut sessions = Vec::new();
        let mut channels = Vec::new();
        for instrument in &self.map.instruments {
            let Some(instrument_channels) = used.get(instrument.name.as_str()) else { continue };
            let session = self.sessions.get(&instrument.name).ok_or_else(||
                ContextError::new(format!("no session is registered for {}", instrument.name)))?;
            sessions.push(session.clone());
            channels.push(instrument_channels.iter()
                .map(|channel| channel.to_string())
                .collect::<Vec<_>>()
                .join(","));
            channel_groups.push((instrument.name.clone(), instrument_channels.iter().copied().collect()));
        }
        let pin_query_context = PinQuery { map: Rc::clone(&self.map), channel_groups };
        Ok(SessionAssignment { pin_query_context, sessions, channels })
    }

    fn site_numbers(&self) -> Vec<u32> {
        self.map.sites.clone()
    }
}

impl<S: Clone> SessionRegistry for TestContext<S> {
    type Session = S;

    fn instrument_names(&self) -> Result<Vec<String>, ContextError> {
        Ok(self.map.instruments.iter().map(|instrument| instrument.name.clone()).collect())
    }

    fn set_session(&mut self, instrument_name: &str, session: S) -> Result<(), ContextError> {
        if self.map.instrument(instrument_name).is_none() {
            return Err(ContextError::new(format!("{} is not in the pin map", instrument_name)))
        }
        self.sessions.insert(instrument_name.to_owned(), session);
        Ok(())
    }

    fn sessions(&self) -> Result<Vec<S>, ContextError> {
        Ok(self.map.instruments.iter()
            .filter_map(|instrument| self.sessions.get(&instrument.name).cloned())
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    fn connect(pin: &str, site: Option<u32>, instrument: &str, channel: usize) -> Connection {
        Connection { pin: pin.to_owned(), site, instrument: instrument.to_owned(), channel }
    }

    /// Two sites; `A` and `B` on two 2-channel scopes, `Clk` on a third one.
    pub(crate) fn pin_map() -> PinMap {
        PinMap {
            dut_pins: vec!["A".into(), "B".into()],
            system_pins: vec!["Clk".into()],
            pin_groups: BTreeMap::from([("G1".to_owned(), vec!["A".to_owned(), "B".to_owned()])]),
            sites: vec![0, 1],
            instruments: vec![
                Instrument { name: "Scope_C1_S02".into(), channel_count: 2 },
                Instrument { name: "Scope_C1_S03".into(), channel_count: 2 },
                Instrument { name: "Scope_C2_S02".into(), channel_count: 2 },
            ],
            connections: vec![
                connect("A", Some(0), "Scope_C1_S02", 0),
                connect("A", Some(1), "Scope_C1_S02", 1),
                connect("B", Some(0), "Scope_C1_S03", 0),
                connect("B", Some(1), "Scope_C1_S03", 1),
                connect("Clk", None, "Scope_C2_S02", 1),
            ],
        }
    }

    /// Every session opened and committed, with the journal cleared.
    pub(crate) fn context(journal: &Journal) -> TestContext<SimulatedSession> {
        let context = pin_map().into_context(journal, "").unwrap();
        journal.clear();
        context
    }

    /// `pins` resolved at every site, with the journal cleared.
    pub(crate) fn scope(journal: &Journal, pins: &[&str])
            -> crate::SessionScopeAggregate<SimulatedSession, PinQuery> {
        crate::resolve(&context(journal), pins, &[]).unwrap()
    }

    #[test]
    fn test_validate() {
        assert!(pin_map().validate().is_ok());
        let mut map = pin_map();
        map.connections.push(connect("B", Some(0), "Scope_C2_S02", 2));
        assert!(map.validate().is_err());
        let mut map = pin_map();
        map.connections.push(connect("B", Some(0), "Scope_C1_S02", 0));
        assert!(map.validate().is_err());
        let mut map = pin_map();
        map.connections.push(connect("Clk", Some(0), "Scope_C2_S02", 0));
        assert!(map.validate().is_err());
        let mut map = pin_map();
        map.pin_groups.insert("G2".into(), vec!["Nope".into()]);
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_pins_to_sessions() {
        let journal = Journal::new();
        let context = context(&journal);
        let pins = ["B".to_owned(), "Clk".to_owned()];
        let assignment = context.pins_to_sessions(&pins, &[0, 1]).unwrap();
        let names = assignment.sessions.iter().map(SimulatedSession::name).collect::<Vec<_>>();
        assert_eq!(names, ["Scope_C1_S03", "Scope_C2_S02"]);
        assert_eq!(assignment.channels, ["0,1", "1"]);
        let table = assignment.pin_query_context.channel_group_and_channel_index(&pins, &[0, 1]).unwrap();
        assert_eq!(table.pins_per_channel_group, [2, 1]);
        let at = |channel_group, channel| ChannelPosition { channel_group, channel };
        assert_eq!(table.positions, [vec![at(0, 0), at(0, 1)], vec![at(1, 0), at(1, 0)]]);
        let table = assignment.pin_query_context.channel_group_and_channel_index(&pins, &[1, 0]).unwrap();
        assert_eq!(table.positions, [vec![at(0, 1), at(0, 0)], vec![at(1, 0), at(1, 0)]]);
    }

    #[test]
    fn test_pins_to_sessions_site_subset() {
        let journal = Journal::new();
        let context = context(&journal);
        let assignment = context.pins_to_sessions(&["G1".to_owned()], &[1]).unwrap();
        assert_eq!(assignment.channels, ["1", "1"]);
        let table = assignment.pin_query_context
            .channel_group_and_channel_index(&["A".to_owned(), "B".to_owned()], &[1]).unwrap();
        assert_eq!(table.pins_per_channel_group, [1, 1]);
        let at = |channel_group, channel| ChannelPosition { channel_group, channel };
        assert_eq!(table.positions, [vec![at(0, 0)], vec![at(1, 0)]]);
    }

    #[test]
    fn test_unregistered_session() {
        let context = TestContext::<SimulatedSession>::new(pin_map()).unwrap();
        assert!(context.pins_to_sessions(&["A".to_owned()], &[0]).is_err());
    }

    #[test]
    fn test_pin_groups() {
        let journal = Journal::new();
        let context = context(&journal);
        let names = ["G1".to_owned(), "Clk".to_owned(), "Nope".to_owned()];
        assert_eq!(context.pins_in_pin_group(&names).unwrap(), ["A", "B", "Clk"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_toml() {
        let map = PinMap::from_toml(r#"
            dut_pins = ["A", "B"]
            system_pins = ["Clk"]
            sites = [0, 1]

            [pin_groups]
            G1 = ["A", "B"]

            [[instruments]]
            name = "Scope_C1_S02"
            channel_count = 2

            [[instruments]]
            name = "Scope_C1_S03"
            channel_count = 2

            [[instruments]]
            name = "Scope_C2_S02"
            channel_count = 2

            [[connections]]
            pin = "A"
            site = 0
            instrument = "Scope_C1_S02"
            channel = 0

            [[connections]]
            pin = "A"
            site = 1
            instrument = "Scope_C1_S02"
            channel = 1

            [[connections]]
            pin = "B"
            site = 0
            instrument = "Scope_C1_S03"
            channel = 0

            [[connections]]
            pin = "B"
            site = 1
            instrument = "Scope_C1_S03"
            channel = 1

            [[connections]]
            pin = "Clk"
            instrument = "Scope_C2_S02"
            channel = 1
        "#).unwrap();
        assert_eq!(map, pin_map());
        assert!(PinMap::from_toml("sites = [0]\n[[connections]]\npin = \"X\"\ninstrument = \"Y\"\nchannel = 0\n").is_err());
    }
}
