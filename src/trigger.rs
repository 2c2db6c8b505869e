//! Trigger configuration and start-trigger distribution across the sessions of an aggregate.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::params::{TriggerCoupling, TriggerModifier, TriggerSlope};
use crate::scope::SessionScopeAggregate;
use crate::sys::ScopeSession;
use crate::terminal::OutputTerminal;
use crate::{Error, Result};

static CHASSIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_C([1-4])_").unwrap());

/// How a shared trigger reaches the sessions of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerRouting {
    /// Every session listens on the trigger source as given.
    #[default]
    Direct,
    /// Every session listens on PFI0 of the timing card in its own chassis, identified by the
    /// `_C<n>_` token of its resource name.
    Stsm1,
}

impl FromStr for TriggerRouting {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "" | "Direct" => Ok(Self::Direct),
            "STSM1" => Ok(Self::Stsm1),
            _ => Err(Error::UnknownRouting(name.to_owned())),
        }
    }
}

fn timing_card_path(resource_name: &str) -> Result<String> {
    let chassis = CHASSIS.captures(resource_name)
        .ok_or_else(|| Error::UnknownChassis(resource_name.to_owned()))?;
    Ok(format!("/SYNC_6674T_C{}_S10/PFI0", &chassis[1]))
}

impl<S: ScopeSession, Q> SessionScopeAggregate<S, Q> {
    pub fn configure_digital_edge_trigger(&self, source: &str, slope: TriggerSlope,
                                          holdoff: f64, delay: f64) -> Result<&Self> {
        for entry in self {
            log::debug!("configuring {} edge trigger on {} for {}", slope, source, entry.channel_list());
            entry.session().configure_trigger_digital(source, slope, holdoff, delay)?;
            entry.session().set_trigger_modifier(TriggerModifier::NoTriggerMod)?;
        }
        Ok(self)
    }

    /// Trigger every entry on an analog edge of its own channels.
    pub fn configure_edge_trigger(&self, level: f64, coupling: TriggerCoupling, slope: TriggerSlope,
                                  holdoff: f64, delay: f64) -> Result<&Self> {
        for entry in self {
            log::debug!("configuring {} edge trigger at {} V on channels {}",
                slope, level, entry.channels());
            entry.session().configure_trigger_edge(entry.channels(), level, coupling, slope,
                holdoff, delay)?;
        }
        Ok(self)
    }

    /// Return every entry to free-running acquisition with nothing exported.
    pub fn clear_triggers(&self) -> Result<&Self> {
        for entry in self {
            log::debug!("clearing triggers for {}", entry.channel_list());
            let session = entry.session();
            session.abort()?;
            session.configure_trigger_immediate()?;
            session.set_exported_start_trigger(OutputTerminal::None)?;
            session.commit()?;
        }
        Ok(self)
    }

    /// Make the first entry the master: it triggers immediately and exports its start trigger
    /// on `terminal`. Every other entry is armed to start on that trigger.
    ///
    /// Returns the path of the exported trigger, or `None` if the aggregate is empty. The path
    /// names the terminal by its driver string, as in `/PXI1Slot2/VAL_PFI_0`, which is also
    /// the source the other entries are armed with.
    pub fn export_start_trigger(&self, terminal: OutputTerminal) -> Result<Option<String>> {
        let mut entries = self.iter();
        let Some(master) = entries.next() else {
            log::debug!("no sessions to export a start trigger from");
            return Ok(None)
        };
        let session = master.session();
        session.configure_trigger_immediate()?;
        session.set_exported_start_trigger(terminal)?;
        session.commit()?;
        let path = format!("/{}/{}", session.resource_name()?, terminal);
        log::debug!("exported start trigger on {}", path);
        for entry in entries {
            log::trace!("arming {} on {}", entry.channel_list(), path);
            entry.session().configure_trigger_digital(&path, TriggerSlope::Positive, 0.0, 0.0)?;
            entry.session().initiate()?;
        }
        Ok(Some(path))
    }

    /// The trigger source each entry has to listen on, in aggregate order.
    pub fn trigger_paths(&self, source: &str, routing: TriggerRouting) -> Result<Vec<String>> {
        self.iter()
            .map(|entry| -> Result<String> {
                match routing {
                    TriggerRouting::Direct => Ok(source.to_owned()),
                    TriggerRouting::Stsm1 => timing_card_path(&entry.session().resource_name()?),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pinmap::test::scope;
    use crate::scope::SessionScope;
    use crate::sys::sim::{Call, Journal, SessionState, SimulatedSession};

    macro_rules! assert_calls {
        ($journal:expr; $( $session:literal => $call:expr ),+ $(,)?) => {
            let events = $journal.events().into_iter()
                .map(|event| (event.session, event.call))
                .collect::<Vec<_>>();
            assert_eq!(events, [ $( ($session.to_owned(), $call) ),+ ]);
        }
    }

    #[test]
    fn test_digital_edge_trigger() {
        let journal = Journal::new();
        let scope = scope(&journal, &["A", "Clk"]);
        scope.configure_digital_edge_trigger("/PXI1Slot9/PFI1", TriggerSlope::Negative, 0.0, 0.0)
            .unwrap();
        let digital = || Call::ConfigureTriggerDigital {
            source: "/PXI1Slot9/PFI1".into(),
            slope: TriggerSlope::Negative,
        };
        assert_calls!(journal;
            "Scope_C1_S02" => digital(),
            "Scope_C1_S02" => Call::SetTriggerModifier(TriggerModifier::NoTriggerMod),
            "Scope_C2_S02" => digital(),
            "Scope_C2_S02" => Call::SetTriggerModifier(TriggerModifier::NoTriggerMod),
        );
    }

    #[test]
    fn test_edge_trigger_own_channels() {
        let journal = Journal::new();
        let scope = scope(&journal, &["B", "Clk"]);
        scope.configure_edge_trigger(0.5, TriggerCoupling::DC, TriggerSlope::Positive, 0.0, 0.0)
            .unwrap();
        assert_calls!(journal;
            "Scope_C1_S03" => Call::ConfigureTriggerEdge {
                source: "0,1".into(), level: 0.5, slope: TriggerSlope::Positive },
            "Scope_C2_S02" => Call::ConfigureTriggerEdge {
                source: "1".into(), level: 0.5, slope: TriggerSlope::Positive },
        );
        assert_eq!(scope.session_properties().unwrap()[1].trigger_source, "1");
    }

    #[test]
    fn test_export_start_trigger() {
        let journal = Journal::new();
        let scope = scope(&journal, &["G1", "Clk"]);
        let path = scope.export_start_trigger(OutputTerminal::Pfi0).unwrap();
        assert_eq!(path.as_deref(), Some("/Scope_C1_S02/VAL_PFI_0"));
        assert_eq!(OutputTerminal::Pfi0.to_string(), "VAL_PFI_0");
        let digital = || Call::ConfigureTriggerDigital {
            source: "/Scope_C1_S02/VAL_PFI_0".into(),
            slope: TriggerSlope::Positive,
        };
        assert_calls!(journal;
            "Scope_C1_S02" => Call::ConfigureTriggerImmediate,
            "Scope_C1_S02" => Call::SetExportedStartTrigger(OutputTerminal::Pfi0),
            "Scope_C1_S02" => Call::Commit,
            "Scope_C1_S03" => digital(),
            "Scope_C1_S03" => Call::Initiate,
            "Scope_C2_S02" => digital(),
            "Scope_C2_S02" => Call::Initiate,
        );
        let states = scope.iter().map(|entry| entry.session().state()).collect::<Vec<_>>();
        assert_eq!(states, [SessionState::Configured, SessionState::Armed, SessionState::Armed]);
    }

    #[test]
    fn test_export_start_trigger_empty() {
        let scope = SessionScopeAggregate::<SimulatedSession, ()>::new((), vec![], vec![], vec![]);
        assert!(matches!(scope.export_start_trigger(OutputTerminal::Pfi0), Ok(None)));
    }

    #[test]
    fn test_clear_triggers() {
        let journal = Journal::new();
        let scope = scope(&journal, &["A"]);
        scope.export_start_trigger(OutputTerminal::PxiTriggerLine0).unwrap();
        journal.clear();
        scope.clear_triggers().unwrap();
        assert_calls!(journal;
            "Scope_C1_S02" => Call::Abort,
            "Scope_C1_S02" => Call::ConfigureTriggerImmediate,
            "Scope_C1_S02" => Call::SetExportedStartTrigger(OutputTerminal::None),
            "Scope_C1_S02" => Call::Commit,
        );
        assert_eq!(scope.entries()[0].session().exported_start_trigger(), OutputTerminal::None);
    }

    #[test]
    fn test_trigger_paths() {
        let journal = Journal::new();
        let scope = scope(&journal, &["G1", "Clk"]);
        assert_eq!(scope.trigger_paths("/PXI1Slot9/PFI1", TriggerRouting::Direct).unwrap(),
            ["/PXI1Slot9/PFI1"; 3]);
        assert_eq!(scope.trigger_paths("", TriggerRouting::Stsm1).unwrap(), [
            "/SYNC_6674T_C1_S10/PFI0",
            "/SYNC_6674T_C1_S10/PFI0",
            "/SYNC_6674T_C2_S10/PFI0",
        ]);
    }

    #[test]
    fn test_trigger_paths_unknown_chassis() {
        let journal = Journal::new();
        let session = SimulatedSession::new("PXI1Slot2", 2, &journal);
        let scope = SessionScopeAggregate::new((), vec![0], vec![],
            vec![SessionScope::new(session, "0", "Site0/A")]);
        assert!(matches!(scope.trigger_paths("", TriggerRouting::Stsm1),
            Err(Error::UnknownChassis(name)) if name == "PXI1Slot2"));
        assert!(scope.trigger_paths("PFI1", TriggerRouting::Direct).is_ok());
    }

    #[test]
    fn test_routing_from_str() {
        assert_eq!("STSM1".parse::<TriggerRouting>().unwrap(), TriggerRouting::Stsm1);
        assert_eq!("".parse::<TriggerRouting>().unwrap(), TriggerRouting::Direct);
        assert!(matches!("STSM2".parse::<TriggerRouting>(), Err(Error::UnknownRouting(_))));
    }
}
