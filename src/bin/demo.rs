use tsm_scope::pinmap::PinMap;
use tsm_scope::sys::sim::{Journal, Signal};
use tsm_scope::{
    close_sessions, Broadcast, HorizontalTiming, OutputTerminal, PerChannelVertical,
    ScalarMeasurement, ScopeConfiguration, TriggerRouting, VerticalCoupling,
};

const PIN_MAP: &str = r#"
dut_pins = ["VIN", "VOUT"]
system_pins = ["REFCLK"]
pin_groups = { Supply = ["VIN", "VOUT"] }
sites = [0, 1]

[[instruments]]
name = "Scope_C1_S02"
channel_count = 4

[[instruments]]
name = "Scope_C2_S05"
channel_count = 2

[[connections]]
pin = "VIN"
site = 0
instrument = "Scope_C1_S02"
channel = 0

[[connections]]
pin = "VOUT"
site = 0
instrument = "Scope_C1_S02"
channel = 1

[[connections]]
pin = "VIN"
site = 1
instrument = "Scope_C1_S02"
channel = 2

[[connections]]
pin = "VOUT"
site = 1
instrument = "Scope_C1_S02"
channel = 3

[[connections]]
pin = "REFCLK"
instrument = "Scope_C2_S05"
channel = 0
"#;

fn main() -> tsm_scope::Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let pin_map = match args.next() {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|error| tsm_scope::ContextError::new(format!("cannot read {}: {}", path, error)))?,
        None => PIN_MAP.to_owned(),
    };
    let pins = args.collect::<Vec<_>>();
    let pins = if pins.is_empty() { vec!["Supply".to_owned(), "REFCLK".to_owned()] } else { pins };

    let journal = Journal::new();
    let context = PinMap::from_toml(&pin_map)?.into_context(&journal, "Simulate=1")?;
    let scope = tsm_scope::resolve(&context, &pins, &[])?;
    for (index, entry) in scope.iter().enumerate() {
        for channel in 0..entry.session().channel_count() {
            let offset = index as f64 + channel as f64 * 0.25;
            entry.session().set_signal(channel, Signal { offset, ..Default::default() });
        }
    }

    // alternate between two ranges across the channels, in channel-list order
    let ranges = (0..scope.per_channel()?.len())
        .map(|channel| if channel % 2 == 0 { 5.0 } else { 10.0 })
        .collect::<Vec<_>>();
    scope.configure(&ScopeConfiguration {
            timing: HorizontalTiming { min_sample_rate: 1e6, ref_position: 10.0, ..Default::default() },
            ..Default::default()
        })?
        .configure_reference_level()?
        .configure_vertical_per_channel(&PerChannelVertical {
            range: Broadcast::from(ranges),
            coupling: VerticalCoupling::DC.into(),
            ..Default::default()
        })?;
    for properties in scope.session_properties()? {
        println!("{}: channels {} serve {} ({} V, {}, {} S/s)",
            properties.instrument_name, properties.channels, properties.channel_list,
            properties.vertical_range, properties.coupling, properties.sample_rate);
    }

    let start_trigger = scope.export_start_trigger(OutputTerminal::PxiTriggerLine0)?;
    println!("start trigger: {}", start_trigger.as_deref().unwrap_or("none"));
    println!("STSM1 trigger paths: {:?}", scope.trigger_paths("", TriggerRouting::Stsm1)?);
    scope.start_acquisition()?;

    for tagged in scope.fetch_waveform(100)? {
        let samples = &tagged.waveform.samples;
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        println!("{:>12} (site {:>2}, pin {:>6}) record {}: {} samples, mean {:.3} V",
            tagged.address.to_string(), tagged.address.site_number(), tagged.address.pin(),
            tagged.waveform.record, samples.len(), mean);
    }
    let maxima = scope.measure_statistics(ScalarMeasurement::VoltageMax)?;
    println!("maximum voltages: {:?}", maxima.iter().map(|stats| stats.result).collect::<Vec<_>>());

    scope.clear_triggers()?;
    close_sessions(&context)?;
    log::info!("{} driver calls issued", journal.events().len());
    Ok(())
}
