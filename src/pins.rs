//! Classification of requested names into DUT pins, system pins and pin groups.

use std::collections::HashMap;

use crate::context::{ContextError, PinMapContext};
use crate::{ResolutionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    DutPin,
    SystemPin,
    PinGroup,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPin {
    name: String,
    kind: PinKind,
}

impl ResolvedPin {
    pub fn new(name: impl Into<String>, kind: PinKind) -> ResolvedPin {
        ResolvedPin { name: name.into(), kind }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PinKind {
        self.kind
    }

    /// Everything except system pins is replicated per site.
    pub fn is_site_scoped(&self) -> bool {
        self.kind != PinKind::SystemPin
    }
}

/// Cached list of every pin in the pin map.
///
/// The roster is loaded from the context the first time it is needed and only reloaded when
/// [`PinRoster::refresh`] is called.
#[derive(Debug, Clone, Default)]
pub struct PinRoster {
    kinds: Option<HashMap<String, PinKind>>,
}

impl PinRoster {
    pub fn new() -> PinRoster {
        PinRoster::default()
    }

    pub fn load<C: PinMapContext + ?Sized>(context: &C) -> Result<PinRoster, ContextError> {
        let mut roster = PinRoster::new();
        roster.refresh(context)?;
        Ok(roster)
    }

    pub fn refresh<C: PinMapContext + ?Sized>(&mut self, context: &C) -> Result<(), ContextError> {
        let (dut_pins, system_pins) = context.pin_names()?;
        log::debug!("loaded pin roster: {} DUT pins, {} system pins",
            dut_pins.len(), system_pins.len());
        let mut kinds = HashMap::new();
        // a name listed as both resolves to the DUT pin, which comes first in pin map order
        for pin in dut_pins {
            kinds.entry(pin).or_insert(PinKind::DutPin);
        }
        for pin in system_pins {
            kinds.entry(pin).or_insert(PinKind::SystemPin);
        }
        self.kinds = Some(kinds);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.kinds.is_some()
    }

    /// The kind of `name`. Names missing from a loaded roster are presumed to be pin groups;
    /// nothing is known about any name before the roster is loaded.
    pub fn kind_of(&self, name: &str) -> PinKind {
        match &self.kinds {
            None => PinKind::Unknown,
            Some(kinds) => kinds.get(name).copied().unwrap_or(PinKind::PinGroup),
        }
    }

    /// Classify `names`, expanding pin groups into their member pins in place.
    ///
    /// The result only contains DUT and system pins, in the order they were requested.
    pub fn classify<C, N>(&mut self, context: &C, names: &[N]) -> Result<Vec<ResolvedPin>>
            where C: PinMapContext + ?Sized, N: AsRef<str> {
        if !self.is_loaded() {
            self.refresh(context)?;
        }
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match self.kind_of(name) {
                kind @ (PinKind::DutPin | PinKind::SystemPin) =>
                    resolved.push(ResolvedPin::new(name, kind)),
                _ => resolved.extend(self.expand_group(context, name)?),
            }
        }
        Ok(resolved)
    }

    fn expand_group<C>(&self, context: &C, group: &str) -> Result<Vec<ResolvedPin>>
            where C: PinMapContext + ?Sized {
        let members = context.pins_in_pin_group(&[group.to_owned()])
            .map_err(|source| ResolutionError::PinGroupExpansion { group: group.to_owned(), source })?;
        if members.is_empty() {
            return Err(ResolutionError::UnresolvedPin(group.to_owned()).into())
        }
        log::trace!("expanded pin group {} into {:?}", group, members);
        members.into_iter()
            .map(|member| match self.kind_of(&member) {
                kind @ (PinKind::DutPin | PinKind::SystemPin) => Ok(ResolvedPin::new(member, kind)),
                // groups do not nest
                _ => Err(ResolutionError::UnresolvedPin(member).into()),
            })
            .collect()
    }
}
