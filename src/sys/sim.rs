//! A simulated oscilloscope session.
//!
//! Every channel digitizes a configurable sine wave. The simulation follows the acquisition
//! lifecycle of a real instrument closely enough to catch ordering mistakes: fetching requires
//! an initiated acquisition, measurement statistics keep accumulating until cleared, and a closed
//! session rejects every call. All calls on all sessions sharing a [`Journal`] are recorded in
//! the order they were issued.

use std::cell::RefCell;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::rc::Rc;

use super::{DriverError, Result, ScopeSession};
use crate::config::{ChannelCharacteristics, HorizontalTiming, ReferenceLevels, VerticalConfiguration};
use crate::params::{
    ClearableMeasurement, FetchRelativeTo, MeasurementStats, ScalarMeasurement, TriggerCoupling,
    TriggerModifier, TriggerSlope, Waveform,
};
use crate::scope::split_channels;
use crate::terminal::OutputTerminal;

pub const STATUS_INVALID_CHANNEL: i32 = -1074118470;
pub const STATUS_NOT_CONFIGURED: i32 = -1074118613;
pub const STATUS_NO_ACQUISITION: i32 = -1074118618;
pub const STATUS_CHANNEL_DISABLED: i32 = -1074118478;
pub const STATUS_SESSION_CLOSED: i32 = -1074130544;
pub const STATUS_COMMIT_FAILED: i32 = -1074118636;
pub const STATUS_RESOURCE_NOT_FOUND: i32 = -1074118656;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ConfigureVertical { channels: String, vertical: VerticalConfiguration },
    ConfigureChanCharacteristics { channels: String, characteristics: ChannelCharacteristics },
    ConfigureHorizontalTiming(HorizontalTiming),
    ConfigureRefLevels { channels: String, levels: ReferenceLevels },
    ConfigureTriggerImmediate,
    ConfigureTriggerDigital { source: String, slope: TriggerSlope },
    ConfigureTriggerEdge { source: String, level: f64, slope: TriggerSlope },
    SetTriggerModifier(TriggerModifier),
    SetExportedStartTrigger(OutputTerminal),
    Initiate,
    Abort,
    Commit,
    Reset,
    ResetDevice,
    Close,
    ClearMeasurementStats { channels: String },
    FetchMeasurementStats { channels: String, measurement: ScalarMeasurement },
    Fetch { channels: String, num_samples: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub session: String,
    pub call: Call,
}

/// Shared, ordered record of the calls made on a set of sessions.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Journal {
    pub fn new() -> Journal {
        Journal::default()
    }

    fn record(&self, session: &str, call: Call) {
        log::trace!("{}: {:?}", session, call);
        self.events.borrow_mut().push(Event { session: session.to_owned(), call });
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn calls(&self, session: &str) -> Vec<Call> {
        self.events.borrow().iter()
            .filter(|event| event.session == session)
            .map(|event| event.call.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Configured,
    Armed,
    Acquired,
    Fetched,
    Closed,
}

/// The signal present at a channel input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub amplitude: f64,
    pub offset: f64,
    pub frequency: f64,
}

impl Default for Signal {
    fn default() -> Self {
        Signal { amplitude: 1.0, offset: 0.0, frequency: 1e3 }
    }
}

impl Signal {
    pub fn measure(&self, measurement: ScalarMeasurement) -> f64 {
        match measurement {
            ScalarMeasurement::Frequency => self.frequency,
            ScalarMeasurement::Period => 1.0 / self.frequency,
            ScalarMeasurement::VoltageRms =>
                (self.offset * self.offset + self.amplitude * self.amplitude / 2.0).sqrt(),
            ScalarMeasurement::VoltagePeakToPeak | ScalarMeasurement::VoltageAmplitude =>
                2.0 * self.amplitude,
            ScalarMeasurement::VoltageMax => self.offset + self.amplitude,
            ScalarMeasurement::VoltageMin => self.offset - self.amplitude,
            ScalarMeasurement::VoltageAverage => self.offset,
        }
    }

    fn sample(&self, time: f64) -> f64 {
        self.offset + self.amplitude * (TAU * self.frequency * time).sin()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) -> MeasurementStats {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let mean = self.sum / self.count as f64;
        let variance = (self.sum_sq / self.count as f64 - mean * mean).max(0.0);
        MeasurementStats {
            result: value,
            mean,
            stdev: variance.sqrt(),
            min_val: self.min,
            max_val: self.max,
            num_in_stats: self.count,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Channel {
    vertical: VerticalConfiguration,
    characteristics: ChannelCharacteristics,
    ref_levels: ReferenceLevels,
    signal: Signal,
    stats: HashMap<ScalarMeasurement, Accumulator>,
}

impl Channel {
    fn reset(&mut self) {
        *self = Channel { signal: self.signal, ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TriggerKind {
    Immediate,
    Digital { source: String, slope: TriggerSlope },
    Edge { source: String, slope: TriggerSlope },
}

#[derive(Debug)]
struct State {
    name: String,
    lifecycle: SessionState,
    channels: Vec<Channel>,
    timing: HorizontalTiming,
    trigger: TriggerKind,
    modifier: TriggerModifier,
    exported: OutputTerminal,
    commit_faults: usize,
}

impl State {
    fn reset(&mut self) {
        self.lifecycle = SessionState::Unconfigured;
        self.channels.iter_mut().for_each(Channel::reset);
        self.timing = HorizontalTiming::default();
        self.trigger = TriggerKind::Immediate;
        self.modifier = TriggerModifier::NoTriggerMod;
        self.exported = OutputTerminal::None;
    }

    fn configured(&mut self) {
        if self.lifecycle == SessionState::Unconfigured {
            self.lifecycle = SessionState::Configured;
        }
    }

    fn channel_indices(&self, channels: &str) -> Result<Vec<usize>> {
        split_channels(channels).iter()
            .map(|channel| match channel.parse::<usize>() {
                Ok(index) if index < self.channels.len() => Ok(index),
                _ => Err(DriverError::new(STATUS_INVALID_CHANNEL,
                    format!("{}: invalid channel {:?}", self.name, channel))),
            })
            .collect()
    }

    fn first_channel(&self, channels: &str) -> Result<usize> {
        self.channel_indices(channels)?.first().copied().ok_or_else(||
            DriverError::new(STATUS_INVALID_CHANNEL, format!("{}: no channel selected", self.name)))
    }

    fn acquisition_available(&self) -> Result<()> {
        match self.lifecycle {
            SessionState::Armed | SessionState::Acquired | SessionState::Fetched => Ok(()),
            _ => Err(DriverError::new(STATUS_NO_ACQUISITION,
                format!("{}: no acquisition in progress", self.name))),
        }
    }

    fn enabled_channel(&self, index: usize) -> Result<&Channel> {
        let channel = &self.channels[index];
        if !channel.vertical.enabled {
            return Err(DriverError::new(STATUS_CHANNEL_DISABLED,
                format!("{}: channel {} is disabled", self.name, index)))
        }
        Ok(channel)
    }
}

/// A cheaply cloneable handle to one simulated instrument.
#[derive(Debug, Clone)]
pub struct SimulatedSession {
    state: Rc<RefCell<State>>,
    journal: Journal,
}

impl SimulatedSession {
    pub fn new(name: &str, channel_count: usize, journal: &Journal) -> SimulatedSession {
        log::debug!("opening simulated session {} with {} channels", name, channel_count);
        SimulatedSession {
            state: Rc::new(RefCell::new(State {
                name: name.to_owned(),
                lifecycle: SessionState::Unconfigured,
                channels: vec![Channel::default(); channel_count],
                timing: HorizontalTiming::default(),
                trigger: TriggerKind::Immediate,
                modifier: TriggerModifier::NoTriggerMod,
                exported: OutputTerminal::None,
                commit_faults: 0,
            })),
            journal: journal.clone(),
        }
    }

    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().lifecycle
    }

    pub fn channel_count(&self) -> usize {
        self.state.borrow().channels.len()
    }

    /// Panics if `channel` does not exist.
    pub fn set_signal(&self, channel: usize, signal: Signal) {
        self.state.borrow_mut().channels[channel].signal = signal;
    }

    /// Make the next `count` commits fail, as a device left in a bad state would.
    pub fn inject_commit_faults(&self, count: usize) {
        self.state.borrow_mut().commit_faults = count;
    }

    pub fn exported_start_trigger(&self) -> OutputTerminal {
        self.state.borrow().exported
    }

    pub fn trigger_modifier(&self) -> TriggerModifier {
        self.state.borrow().modifier
    }

    pub fn ref_levels(&self, channel: usize) -> ReferenceLevels {
        self.state.borrow().channels[channel].ref_levels
    }

    fn call<R, F: FnOnce(&mut State) -> Result<R>>(&self, call: Call, f: F) -> Result<R> {
        let mut state = self.state.borrow_mut();
        self.journal.record(&state.name, call);
        if state.lifecycle == SessionState::Closed {
            return Err(DriverError::new(STATUS_SESSION_CLOSED,
                format!("{}: session is closed", state.name)))
        }
        f(&mut *state)
    }

    fn query<R, F: FnOnce(&State) -> Result<R>>(&self, f: F) -> Result<R> {
        let state = self.state.borrow();
        if state.lifecycle == SessionState::Closed {
            return Err(DriverError::new(STATUS_SESSION_CLOSED,
                format!("{}: session is closed", state.name)))
        }
        f(&*state)
    }
}

impl ScopeSession for SimulatedSession {
    fn resource_name(&self) -> Result<String> {
        self.query(|state| Ok(state.name.clone()))
    }

    fn num_channels(&self) -> Result<usize> {
        self.query(|state| Ok(state.channels.len()))
    }

    fn configure_vertical(&self, channels: &str, vertical: &VerticalConfiguration) -> Result<()> {
        let call = Call::ConfigureVertical { channels: channels.to_owned(), vertical: *vertical };
        self.call(call, |state| {
            for index in state.channel_indices(channels)? {
                state.channels[index].vertical = *vertical;
            }
            state.configured();
            Ok(())
        })
    }

    fn configure_chan_characteristics(&self, channels: &str, characteristics: &ChannelCharacteristics)
            -> Result<()> {
        let call = Call::ConfigureChanCharacteristics {
            channels: channels.to_owned(),
            characteristics: *characteristics,
        };
        self.call(call, |state| {
            for index in state.channel_indices(channels)? {
                state.channels[index].characteristics = *characteristics;
            }
            state.configured();
            Ok(())
        })
    }

    fn configure_horizontal_timing(&self, timing: &HorizontalTiming) -> Result<()> {
        self.call(Call::ConfigureHorizontalTiming(*timing), |state| {
            state.timing = *timing;
            state.configured();
            Ok(())
        })
    }

    fn configure_ref_levels(&self, channels: &str, levels: &ReferenceLevels) -> Result<()> {
        let call = Call::ConfigureRefLevels { channels: channels.to_owned(), levels: *levels };
        self.call(call, |state| {
            for index in state.channel_indices(channels)? {
                state.channels[index].ref_levels = *levels;
            }
            Ok(())
        })
    }

    fn configure_trigger_immediate(&self) -> Result<()> {
        self.call(Call::ConfigureTriggerImmediate, |state| {
            state.trigger = TriggerKind::Immediate;
            state.configured();
            Ok(())
        })
    }

    fn configure_trigger_digital(&self, source: &str, slope: TriggerSlope, _holdoff: f64, _delay: f64)
            -> Result<()> {
        let call = Call::ConfigureTriggerDigital { source: source.to_owned(), slope };
        self.call(call, |state| {
            state.trigger = TriggerKind::Digital { source: source.to_owned(), slope };
            state.configured();
            Ok(())
        })
    }

    fn configure_trigger_edge(&self, source: &str, level: f64, _coupling: TriggerCoupling,
                              slope: TriggerSlope, _holdoff: f64, _delay: f64) -> Result<()> {
        let call = Call::ConfigureTriggerEdge { source: source.to_owned(), level, slope };
        self.call(call, |state| {
            state.channel_indices(source)?;
            state.trigger = TriggerKind::Edge { source: source.to_owned(), slope };
            state.configured();
            Ok(())
        })
    }

    fn set_trigger_modifier(&self, modifier: TriggerModifier) -> Result<()> {
        self.call(Call::SetTriggerModifier(modifier), |state| {
            state.modifier = modifier;
            Ok(())
        })
    }

    fn set_exported_start_trigger(&self, terminal: OutputTerminal) -> Result<()> {
        self.call(Call::SetExportedStartTrigger(terminal), |state| {
            state.exported = terminal;
            Ok(())
        })
    }

    fn initiate(&self) -> Result<()> {
        self.call(Call::Initiate, |state| {
            if state.lifecycle == SessionState::Unconfigured {
                return Err(DriverError::new(STATUS_NOT_CONFIGURED,
                    format!("{}: session has not been configured", state.name)))
            }
            // an immediate trigger fires as soon as the session is armed
            state.lifecycle = match state.trigger {
                TriggerKind::Immediate => SessionState::Acquired,
                _ => SessionState::Armed,
            };
            Ok(())
        })
    }

    fn abort(&self) -> Result<()> {
        self.call(Call::Abort, |state| {
            if state.lifecycle != SessionState::Unconfigured {
                state.lifecycle = SessionState::Configured;
            }
            Ok(())
        })
    }

    fn commit(&self) -> Result<()> {
        self.call(Call::Commit, |state| {
            if state.commit_faults > 0 {
                state.commit_faults -= 1;
                return Err(DriverError::new(STATUS_COMMIT_FAILED,
                    format!("{}: failed to commit attributes", state.name)))
            }
            state.configured();
            Ok(())
        })
    }

    fn reset(&self) -> Result<()> {
        self.call(Call::Reset, |state| {
            state.reset();
            Ok(())
        })
    }

    fn reset_device(&self) -> Result<()> {
        self.call(Call::ResetDevice, |state| {
            state.reset();
            state.commit_faults = 0;
            Ok(())
        })
    }

    fn close(&self) -> Result<()> {
        self.call(Call::Close, |state| {
            state.lifecycle = SessionState::Closed;
            Ok(())
        })
    }

    fn clear_measurement_stats(&self, channels: &str, which: ClearableMeasurement) -> Result<()> {
        self.call(Call::ClearMeasurementStats { channels: channels.to_owned() }, |state| {
            for index in state.channel_indices(channels)? {
                let stats = &mut state.channels[index].stats;
                match which {
                    ClearableMeasurement::AllMeasurements => stats.clear(),
                    ClearableMeasurement::Scalar(measurement) => { stats.remove(&measurement); }
                }
            }
            Ok(())
        })
    }

    fn fetch_measurement_stats(&self, channels: &str, measurement: ScalarMeasurement,
                               num_records: Option<usize>) -> Result<Vec<MeasurementStats>> {
        let call = Call::FetchMeasurementStats { channels: channels.to_owned(), measurement };
        self.call(call, |state| {
            state.acquisition_available()?;
            let num_records = num_records.unwrap_or(state.timing.num_records);
            let mut results = Vec::new();
            for index in state.channel_indices(channels)? {
                let value = state.enabled_channel(index)?.signal.measure(measurement);
                let accumulator = state.channels[index].stats.entry(measurement).or_default();
                for _ in 0..num_records {
                    results.push(accumulator.add(value));
                }
            }
            state.lifecycle = SessionState::Fetched;
            Ok(results)
        })
    }

    fn fetch(&self, channels: &str, num_samples: usize, relative_to: FetchRelativeTo)
            -> Result<Vec<Waveform>> {
        let call = Call::Fetch { channels: channels.to_owned(), num_samples };
        self.call(call, |state| {
            state.acquisition_available()?;
            let x_increment = 1.0 / state.timing.min_sample_rate;
            let relative_initial_x = match relative_to {
                FetchRelativeTo::Pretrigger =>
                    -(state.timing.ref_position / 100.0) * num_samples as f64 * x_increment,
                _ => 0.0,
            };
            let mut waveforms = Vec::new();
            for index in state.channel_indices(channels)? {
                let channel = state.enabled_channel(index)?;
                let VerticalConfiguration { range, offset, .. } = channel.vertical;
                for record in 0..state.timing.num_records {
                    let samples = (0..num_samples)
                        .map(|n| relative_initial_x + n as f64 * x_increment)
                        .map(|time| channel.signal.sample(time))
                        .map(|volts| volts.clamp(offset - range / 2.0, offset + range / 2.0))
                        .collect();
                    waveforms.push(Waveform {
                        channel: index.to_string(),
                        record,
                        relative_initial_x,
                        x_increment,
                        samples,
                    });
                }
            }
            state.lifecycle = SessionState::Fetched;
            Ok(waveforms)
        })
    }

    fn vertical(&self, channels: &str) -> Result<VerticalConfiguration> {
        self.query(|state| {
            let index = state.first_channel(channels)?;
            Ok(state.channels[index].vertical)
        })
    }

    fn chan_characteristics(&self, channels: &str) -> Result<ChannelCharacteristics> {
        self.query(|state| {
            let index = state.first_channel(channels)?;
            Ok(state.channels[index].characteristics)
        })
    }

    fn horizontal_sample_rate(&self) -> Result<f64> {
        self.query(|state| Ok(state.timing.min_sample_rate))
    }

    fn trigger_source(&self) -> Result<String> {
        self.query(|state| Ok(match &state.trigger {
            TriggerKind::Immediate => "VAL_IMMEDIATE".to_owned(),
            TriggerKind::Digital { source, .. } | TriggerKind::Edge { source, .. } => source.clone(),
        }))
    }

    fn trigger_slope(&self) -> Result<TriggerSlope> {
        self.query(|state| Ok(match &state.trigger {
            TriggerKind::Immediate => TriggerSlope::Positive,
            TriggerKind::Digital { slope, .. } | TriggerKind::Edge { slope, .. } => *slope,
        }))
    }
}
