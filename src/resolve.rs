//! Resolution of pins and sites into the channel lists of the sessions that serve them.

use std::collections::BTreeSet;

use crate::context::{ChannelIndexTable, PinMapContext, PinQueryContext};
use crate::pins::{PinRoster, ResolvedPin};
use crate::scope::{ChannelAddress, SessionScope, SessionScopeAggregate};
use crate::{ResolutionError, Result};

/// Collects the channel addresses of one session before they are frozen into a channel list.
///
/// The width is fixed when the builder is created. Every position must be filled exactly once
/// (repeating the same address is allowed, as system pins are written once per site).
#[derive(Debug, Clone)]
pub struct SessionSlotBuilder {
    channel_group: usize,
    positions: Vec<Option<String>>,
}

impl SessionSlotBuilder {
    pub fn new(channel_group: usize, width: usize) -> SessionSlotBuilder {
        SessionSlotBuilder { channel_group, positions: vec![None; width] }
    }

    pub fn width(&self) -> usize {
        self.positions.len()
    }

    pub fn set(&mut self, channel: usize, address: String) -> Result<(), ResolutionError> {
        let width = self.width();
        let channel_group = self.channel_group;
        let position = self.positions.get_mut(channel)
            .ok_or(ResolutionError::ChannelOutOfRange { channel_group, channel, width })?;
        match position {
            Some(existing) if *existing != address =>
                Err(ResolutionError::ChannelConflict {
                    channel_group,
                    channel,
                    existing: existing.clone(),
                    address,
                }),
            _ => {
                *position = Some(address);
                Ok(())
            }
        }
    }

    pub fn finish(self) -> Result<String, ResolutionError> {
        let channel_group = self.channel_group;
        let addresses = self.positions.into_iter().enumerate()
            .map(|(channel, address)|
                address.ok_or(ResolutionError::UnfilledChannel { channel_group, channel }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(addresses.join(","))
    }
}

/// Build one channel list per channel group.
///
/// Sites are visited in the order of `sites` and, within a site, pins in the order of `pins`;
/// each (site, pin) pair writes its address to the position the table assigns it. Column `k`
/// of the table must describe `sites[k]`.
pub fn channel_lists(pins: &[ResolvedPin], sites: &[u32], table: &ChannelIndexTable)
        -> Result<Vec<String>, ResolutionError> {
    if let Some(site) = duplicate_site(sites) {
        return Err(ResolutionError::DuplicateSite(site))
    }
    if table.positions.len() != pins.len() {
        return Err(ResolutionError::PinCountMismatch { pins: pins.len(), table: table.positions.len() })
    }
    for (pin, row) in pins.iter().zip(&table.positions) {
        if row.len() != sites.len() {
            return Err(ResolutionError::SiteCountMismatch {
                pin: pin.name().to_owned(),
                sites: sites.len(),
                table: row.len(),
            })
        }
    }

    let mut slots = table.pins_per_channel_group.iter().enumerate()
        .map(|(channel_group, &width)| SessionSlotBuilder::new(channel_group, width))
        .collect::<Vec<_>>();
    let count = slots.len();
    for (site_index, &site) in sites.iter().enumerate() {
        for (pin, row) in pins.iter().zip(&table.positions) {
            let position = row[site_index];
            let slot = slots.get_mut(position.channel_group)
                .ok_or(ResolutionError::ChannelGroupOutOfRange {
                    channel_group: position.channel_group,
                    count,
                })?;
            slot.set(position.channel, ChannelAddress::for_pin(pin, site).to_string())?;
        }
    }
    slots.into_iter().map(SessionSlotBuilder::finish).collect()
}

fn duplicate_site(sites: &[u32]) -> Option<u32> {
    let mut seen = BTreeSet::new();
    sites.iter().copied().find(|&site| !seen.insert(site))
}

/// Resolves pin requests against one context, caching its pin roster.
#[derive(Debug)]
pub struct Resolver<'a, C: ?Sized> {
    context: &'a C,
    roster: PinRoster,
}

impl<'a, C: PinMapContext + ?Sized> Resolver<'a, C> {
    pub fn new(context: &'a C) -> Self {
        Resolver { context, roster: PinRoster::new() }
    }

    pub fn roster(&self) -> &PinRoster {
        &self.roster
    }

    /// Reload the pin roster, e.g. after the pin map changed.
    pub fn refresh(&mut self) -> Result<()> {
        Ok(self.roster.refresh(self.context)?)
    }

    /// Map `pins` at `site_numbers` onto sessions. An empty site list selects every site of
    /// the context; otherwise each site must be active and requested once, in any order.
    pub fn resolve<N: AsRef<str>>(&mut self, pins: &[N], site_numbers: &[u32])
            -> Result<SessionScopeAggregate<C::Session, C::PinQuery>> {
        let resolved = self.roster.classify(self.context, pins)?;
        let active = self.context.site_numbers();
        let site_numbers = if site_numbers.is_empty() {
            active
        } else {
            if let Some(&site) = site_numbers.iter().find(|&&site| !active.contains(&site)) {
                return Err(ResolutionError::UnknownSite(site).into())
            }
            if let Some(site) = duplicate_site(site_numbers) {
                return Err(ResolutionError::DuplicateSite(site).into())
            }
            site_numbers.to_vec()
        };
        let names = resolved.iter().map(|pin| pin.name().to_owned()).collect::<Vec<_>>();
        log::debug!("resolving pins {:?} at sites {:?}", names, site_numbers);

        let assignment = self.context.pins_to_sessions(&names, &site_numbers)?;
        let table = assignment.pin_query_context.channel_group_and_channel_index(&names, &site_numbers)?;
        let lists = channel_lists(&resolved, &site_numbers, &table)?;
        if assignment.sessions.len() != assignment.channels.len()
                || assignment.sessions.len() != lists.len() {
            return Err(ResolutionError::SessionCountMismatch {
                sessions: assignment.sessions.len(),
                channels: assignment.channels.len(),
                lists: lists.len(),
            }.into())
        }

        let entries = assignment.sessions.into_iter()
            .zip(assignment.channels)
            .zip(lists)
            .map(|((session, channels), channel_list)| {
                log::debug!("  channels {:?} serve {:?}", channels, channel_list);
                let entry = SessionScope::new(session, channels, channel_list);
                entry.pairs()?;
                Ok(entry)
            })
            .collect::<Result<Vec<_>, ResolutionError>>()?;
        Ok(SessionScopeAggregate::new(assignment.pin_query_context, site_numbers, resolved, entries))
    }
}

/// Resolve a single request with a freshly loaded roster.
pub fn resolve<C, N>(context: &C, pins: &[N], site_numbers: &[u32])
        -> Result<SessionScopeAggregate<C::Session, C::PinQuery>>
        where C: PinMapContext + ?Sized, N: AsRef<str> {
    Resolver::new(context).resolve(pins, site_numbers)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeSet;

use crate::context::ChannelPosition;
    use crate::pinmap::test::context;
    use crate::pins::PinKind;
    use crate::sys::sim::{Journal, SimulatedSession};

    fn dut(name: &str) -> ResolvedPin {
        ResolvedPin::new(name, PinKind::DutPin)
    }

    fn sys(name: &str) -> ResolvedPin {
        ResolvedPin::new(name, PinKind::SystemPin)
    }

    fn table(widths: &[usize], rows: &[&[(usize, usize)]]) -> ChannelIndexTable {
        ChannelIndexTable {
            pins_per_channel_group: widths.to_vec(),
            positions: rows.iter()
                .map(|row| row.iter()
                    .map(|&(channel_group, channel)| ChannelPosition { channel_group, channel })
                    .collect())
                .collect(),
        }
    }

    fn lists(scope: &SessionScopeAggregate<SimulatedSession, crate::pinmap::PinQuery>)
            -> Vec<(String, String, String)> {
        scope.iter()
            .map(|entry| (entry.session().name(), entry.channels().to_owned(), entry.channel_list().to_owned()))
            .collect()
    }

    #[test]
    fn test_slot_builder() {
        let mut slot = SessionSlotBuilder::new(1, 2);
        slot.set(1, "Site0/B".into()).unwrap();
        assert!(matches!(slot.set(2, "Site1/B".into()),
            Err(ResolutionError::ChannelOutOfRange { channel_group: 1, channel: 2, width: 2 })));
        assert!(matches!(slot.clone().finish(),
            Err(ResolutionError::UnfilledChannel { channel_group: 1, channel: 0 })));
        slot.set(0, "Clk".into()).unwrap();
        slot.set(0, "Clk".into()).unwrap();
        assert!(matches!(slot.set(0, "Site0/A".into()), Err(ResolutionError::ChannelConflict { .. })));
        assert_eq!(slot.finish().unwrap(), "Clk,Site0/B");
    }

    #[test]
    fn test_site_major_interleaving() {
        // pins A and B share one 4-channel session, sites interleave
        let table = table(&[4], &[&[(0, 0), (0, 2)], &[(0, 1), (0, 3)]]);
        let lists = channel_lists(&[dut("A"), dut("B")], &[0, 1], &table).unwrap();
        assert_eq!(lists, ["Site0/A,Site0/B,Site1/A,Site1/B"]);
    }

    #[test]
    fn test_site_numbers_used_verbatim() {
        let table = table(&[1, 1], &[&[(1, 0), (0, 0)]]);
        let lists = channel_lists(&[dut("A")], &[7, 3], &table).unwrap();
        assert_eq!(lists, ["Site3/A", "Site7/A"]);
    }

    #[test]
    fn test_system_pins_unprefixed() {
        let table = table(&[2, 1], &[&[(0, 0), (0, 1)], &[(1, 0), (1, 0)]]);
        let lists = channel_lists(&[dut("A"), sys("Clk")], &[0, 1], &table).unwrap();
        assert_eq!(lists, ["Site0/A,Site1/A", "Clk"]);
    }

    #[test]
    fn test_out_of_range() {
        let bad_channel = table(&[1], &[&[(0, 1)]]);
        assert!(matches!(channel_lists(&[dut("A")], &[0], &bad_channel),
            Err(ResolutionError::ChannelOutOfRange { .. })));
        let bad_group = table(&[1], &[&[(1, 0)]]);
        assert!(matches!(channel_lists(&[dut("A")], &[0], &bad_group),
            Err(ResolutionError::ChannelGroupOutOfRange { channel_group: 1, count: 1 })));
    }

    #[test]
    fn test_shape_mismatch() {
        let table = table(&[2], &[&[(0, 0), (0, 1)]]);
        assert!(matches!(channel_lists(&[dut("A"), dut("B")], &[0, 1], &table),
            Err(ResolutionError::PinCountMismatch { pins: 2, table: 1 })));
        assert!(matches!(channel_lists(&[dut("A")], &[0], &table),
            Err(ResolutionError::SiteCountMismatch { sites: 1, table: 2, .. })));
    }

    #[test]
    fn test_duplicate_site() {
        let table = table(&[2], &[&[(0, 0), (0, 1)]]);
        assert!(matches!(channel_lists(&[dut("A")], &[3, 3], &table),
            Err(ResolutionError::DuplicateSite(3))));
    }

    #[test]
    fn test_unfilled() {
        let table = table(&[3], &[&[(0, 0), (0, 1)]]);
        assert!(matches!(channel_lists(&[dut("A")], &[0, 1], &table),
            Err(ResolutionError::UnfilledChannel { channel_group: 0, channel: 2 })));
    }

    #[test]
    fn test_resolve() {
        let journal = Journal::new();
        let context = context(&journal);
        let scope = resolve(&context, &["G1", "Clk"], &[]).unwrap();
        assert_eq!(scope.site_numbers(), [0, 1]);
        assert_eq!(scope.pins(), [dut("A"), dut("B"), sys("Clk")]);
        assert_eq!(lists(&scope), [
            ("Scope_C1_S02".to_owned(), "0,1".to_owned(), "Site0/A,Site1/A".to_owned()),
            ("Scope_C1_S03".to_owned(), "0,1".to_owned(), "Site0/B,Site1/B".to_owned()),
            ("Scope_C2_S02".to_owned(), "1".to_owned(), "Clk".to_owned()),
        ]);
        assert!(journal.events().is_empty());
    }

    #[test]
    fn test_resolve_deterministic() {
        let journal = Journal::new();
        let context = context(&journal);
        let mut resolver = Resolver::new(&context);
        let first = lists(&resolver.resolve(&["B", "A"], &[0, 1]).unwrap());
        for _ in 0..3 {
            assert_eq!(lists(&resolver.resolve(&["B", "A"], &[0, 1]).unwrap()), first);
        }
        resolver.refresh().unwrap();
        assert_eq!(lists(&resolver.resolve(&["B", "A"], &[]).unwrap()), first);
    }

    #[test]
    fn test_resolve_unknown_pin() {
        let journal = Journal::new();
        let context = context(&journal);
        assert!(matches!(resolve(&context, &["A", "Nope"], &[]),
            Err(crate::Error::Resolution(ResolutionError::UnresolvedPin(name))) if name == "Nope"));
    }

    #[test]
    fn test_resolve_explicit_sites() {
        let journal = Journal::new();
        let context = context(&journal);
        let all = lists(&resolve(&context, &["G1", "Clk"], &[]).unwrap());
        let scope = resolve(&context, &["G1", "Clk"], &[0, 1]).unwrap();
        assert_eq!(scope.site_numbers(), [0, 1]);
        assert_eq!(lists(&scope), all);
    }

    #[test]
    fn test_resolve_reordered_sites() {
        let journal = Journal::new();
        let context = context(&journal);
        let scope = resolve(&context, &["A"], &[1, 0]).unwrap();
        assert_eq!(scope.site_numbers(), [1, 0]);
        // channel 0 is wired to site 0 whatever order the sites are requested in
        assert_eq!(lists(&scope), [
            ("Scope_C1_S02".to_owned(), "0,1".to_owned(), "Site0/A,Site1/A".to_owned()),
        ]);
        let pairs = scope.iter().next().unwrap().pairs().unwrap();
        assert_eq!(pairs[0], ("0".to_owned(), "Site0/A".to_owned()));
        assert_eq!(pairs[1], ("1".to_owned(), "Site1/A".to_owned()));
    }

    #[test]
    fn test_resolve_site_subset() {
        let journal = Journal::new();
        let context = context(&journal);
        let scope = resolve(&context, &["A"], &[1]).unwrap();
        assert_eq!(scope.site_numbers(), [1]);
        assert_eq!(lists(&scope), [
            ("Scope_C1_S02".to_owned(), "1".to_owned(), "Site1/A".to_owned()),
        ]);
        let scope = resolve(&context, &["G1", "Clk"], &[0]).unwrap();
        assert_eq!(lists(&scope), [
            ("Scope_C1_S02".to_owned(), "0".to_owned(), "Site0/A".to_owned()),
            ("Scope_C1_S03".to_owned(), "0".to_owned(), "Site0/B".to_owned()),
            ("Scope_C2_S02".to_owned(), "1".to_owned(), "Clk".to_owned()),
        ]);
    }

    #[test]
    fn test_resolve_rejects_bad_sites() {
        let journal = Journal::new();
        let context = context(&journal);
        assert!(matches!(resolve(&context, &["A"], &[0, 0]),
            Err(crate::Error::Resolution(ResolutionError::DuplicateSite(0)))));
        assert!(matches!(resolve(&context, &["A"], &[0, 7]),
            Err(crate::Error::Resolution(ResolutionError::UnknownSite(7)))));
    }
}
