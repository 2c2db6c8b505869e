//! Starting, stopping and committing acquisitions across an aggregate.

use crate::scope::SessionScopeAggregate;
use crate::sys::ScopeSession;
use crate::Result;

impl<S: ScopeSession, Q> SessionScopeAggregate<S, Q> {
    pub fn initiate(&self) -> Result<&Self> {
        for entry in self {
            log::debug!("initiating {}", entry.channel_list());
            entry.session().initiate()?;
        }
        Ok(self)
    }

    pub fn abort(&self) -> Result<&Self> {
        for entry in self {
            log::debug!("aborting {}", entry.channel_list());
            entry.session().abort()?;
        }
        Ok(self)
    }

    pub fn commit(&self) -> Result<&Self> {
        for entry in self {
            entry.session().commit()?;
        }
        Ok(self)
    }

    /// Restart acquisition on every entry, the first entry last.
    ///
    /// Followers armed by [`export_start_trigger`](Self::export_start_trigger) are waiting for
    /// the first entry, so it has to start after all of them are armed again.
    pub fn start_acquisition(&self) -> Result<&Self> {
        for entry in self.iter().rev() {
            log::debug!("starting acquisition on {}", entry.channel_list());
            entry.session().abort()?;
            entry.session().initiate()?;
        }
        Ok(self)
    }
}
