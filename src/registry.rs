//! Opening and closing every oscilloscope session a test program uses.

use crate::config::ChannelCharacteristics;
use crate::context::SessionRegistry;
use crate::sys::{DriverError, ScopeSession};
use crate::Result;

/// Open a session for every instrument in the registry and register it.
///
/// `open` is called with the instrument name and `options`, and is expected to reset the
/// device as part of opening it. A session that then fails to commit is reset once more before
/// it is set up; any other failure aborts initialization. Every channel of the instrument is
/// set to 1 MΩ input impedance.
pub fn initialize_sessions<R, F>(registry: &mut R, mut open: F, options: &str) -> Result<()>
        where R: SessionRegistry + ?Sized,
              R::Session: ScopeSession,
              F: FnMut(&str, &str) -> Result<R::Session, DriverError> {
    let characteristics = ChannelCharacteristics { input_impedance: 1e6, max_input_frequency: -1.0 };
    for instrument_name in registry.instrument_names()? {
        log::debug!("opening {} with options {:?}", instrument_name, options);
        let session = open(&instrument_name, options)?;
        if let Err(error) = session.commit() {
            log::warn!("{}: {}; resetting device", instrument_name, error);
            session.reset_device()?;
        }
        let channels = (0..session.num_channels()?)
            .map(|channel| channel.to_string())
            .collect::<Vec<_>>()
            .join(",");
        session.configure_chan_characteristics(&channels, &characteristics)?;
        session.commit()?;
        registry.set_session(&instrument_name, session)?;
    }
    Ok(())
}

/// Reset and close every registered session.
pub fn close_sessions<R>(registry: &R) -> Result<()>
        where R: SessionRegistry + ?Sized, R::Session: ScopeSession {
    for session in registry.sessions()? {
        log::debug!("closing {}", session.resource_name()?);
        session.reset()?;
        session.close()?;
    }
    Ok(())
}
