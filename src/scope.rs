//! The session-scope aggregate: every physical session taking part in one logical pin request.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::pins::ResolvedPin;
use crate::ResolutionError;

static SITE_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Site(\d+)[/\\](.+)$").unwrap());
static CHANNEL_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*[-:]\s*(\d+)$").unwrap());

/// Split a comma-separated list, ignoring whitespace around the commas.
pub fn split_list(list: &str) -> Vec<String> {
    if list.trim().is_empty() {
        return Vec::new()
    }
    list.split(',').map(|item| item.trim().to_owned()).collect()
}

/// Split a channel-subset descriptor into individual channels. Numeric ranges such as `0-3`
/// (or `0:3`) expand to every channel they cover, in the order written.
pub fn split_channels(descriptor: &str) -> Vec<String> {
    let mut channels = Vec::new();
    for item in split_list(descriptor) {
        match CHANNEL_RANGE.captures(&item) {
            Some(range) => {
                // both captures are all digits; they can only fail to parse by overflowing
                match (range[1].parse::<usize>(), range[2].parse::<usize>()) {
                    (Ok(first), Ok(last)) if first <= last =>
                        channels.extend((first..=last).map(|channel| channel.to_string())),
                    (Ok(first), Ok(last)) =>
                        channels.extend((last..=first).rev().map(|channel| channel.to_string())),
                    _ => channels.push(item),
                }
            }
            None => channels.push(item),
        }
    }
    channels
}

/// Identifies one physical channel slot by the pin (and, for DUT pins, the site) it serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelAddress {
    site: Option<u32>,
    pin: String,
}

impl ChannelAddress {
    pub fn site_scoped(site: u32, pin: impl Into<String>) -> ChannelAddress {
        ChannelAddress { site: Some(site), pin: pin.into() }
    }

    pub fn global(pin: impl Into<String>) -> ChannelAddress {
        ChannelAddress { site: None, pin: pin.into() }
    }

    /// System pins are shared by all sites and are addressed without a site prefix.
    pub fn for_pin(pin: &ResolvedPin, site: u32) -> ChannelAddress {
        if pin.is_site_scoped() {
            Self::site_scoped(site, pin.name())
        } else {
            Self::global(pin.name())
        }
    }

    pub fn site(&self) -> Option<u32> {
        self.site
    }

    /// The site number, or `-1` for a channel that is not scoped to a site.
    pub fn site_number(&self) -> i64 {
        self.site.map_or(-1, i64::from)
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.site {
            Some(site) => write!(f, "Site{}/{}", site, self.pin),
            None => f.write_str(&self.pin),
        }
    }
}

impl FromStr for ChannelAddress {
    type Err = ResolutionError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let malformed = || ResolutionError::MalformedAddress(address.to_owned());
        if let Some(captures) = SITE_ADDRESS.captures(address) {
            let site = captures[1].parse().map_err(|_| malformed())?;
            return Ok(Self::site_scoped(site, &captures[2]))
        }
        if address.is_empty() || address.contains(['/', '\\']) {
            return Err(malformed())
        }
        Ok(Self::global(address))
    }
}

/// Parse a channel list back into the addresses it is made of.
pub fn channel_list_to_pins(channel_list: &str) -> Result<Vec<ChannelAddress>, ResolutionError> {
    split_list(channel_list).iter().map(|address| address.parse()).collect()
}

/// One session together with the channels a request owns on it.
///
/// `channel_list` is aligned positionally with `channels`: the n-th address names the pin
/// connected to the n-th channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionScope<S> {
    session: S,
    channels: String,
    channel_list: String,
}

impl<S> SessionScope<S> {
    pub fn new(session: S, channels: impl Into<String>, channel_list: impl Into<String>) -> Self {
        SessionScope { session, channels: channels.into(), channel_list: channel_list.into() }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn channels(&self) -> &str {
        &self.channels
    }

    pub fn channel_list(&self) -> &str {
        &self.channel_list
    }

    pub fn addresses(&self) -> Result<Vec<ChannelAddress>, ResolutionError> {
        channel_list_to_pins(&self.channel_list)
    }

    /// Individual channels paired with their addresses.
    pub fn pairs(&self) -> Result<Vec<(String, String)>, ResolutionError> {
        let channels = split_channels(&self.channels);
        let addresses = split_list(&self.channel_list);
        if channels.len() != addresses.len() {
            return Err(ResolutionError::ChannelCountMismatch {
                channels: self.channels.clone(),
                channel_list: self.channel_list.clone(),
            })
        }
        Ok(channels.into_iter().zip(addresses).collect())
    }
}

/// Every session participating in one logical pin request, in pin-map order.
///
/// The aggregate is never reshaped by the operations applied to it; only the state inside the
/// referenced sessions changes. Entry order is significant: operations that single out a master
/// session pick the first entry.
#[derive(Debug, Clone)]
pub struct SessionScopeAggregate<S, Q> {
    pin_query_context: Q,
    site_numbers: Vec<u32>,
    pins: Vec<ResolvedPin>,
    entries: Vec<SessionScope<S>>,
}

impl<S, Q> SessionScopeAggregate<S, Q> {
    pub fn new(pin_query_context: Q, site_numbers: Vec<u32>, pins: Vec<ResolvedPin>,
               entries: Vec<SessionScope<S>>) -> Self {
        SessionScopeAggregate { pin_query_context, site_numbers, pins, entries }
    }

    pub fn pin_query_context(&self) -> &Q {
        &self.pin_query_context
    }

    pub fn site_numbers(&self) -> &[u32] {
        &self.site_numbers
    }

    pub fn pins(&self) -> &[ResolvedPin] {
        &self.pins
    }

    pub fn entries(&self) -> &[SessionScope<S>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SessionScope<S>> {
        self.entries.iter()
    }
}

impl<S: Clone, Q: Clone> SessionScopeAggregate<S, Q> {
    /// Split every entry into one entry per channel, keeping entry and channel order.
    pub fn per_channel(&self) -> Result<Self, ResolutionError> {
        let mut entries = Vec::new();
        for entry in &self.entries {
            for (channel, address) in entry.pairs()? {
                entries.push(SessionScope::new(entry.session.clone(), channel, address));
            }
        }
        log::trace!("expanded {} entries into {} channels", self.entries.len(), entries.len());
        Ok(SessionScopeAggregate {
            pin_query_context: self.pin_query_context.clone(),
            site_numbers: self.site_numbers.clone(),
            pins: self.pins.clone(),
            entries,
        })
    }
}

impl<'a, S, Q> IntoIterator for &'a SessionScopeAggregate<S, Q> {
    type Item = &'a SessionScope<S>;
    type IntoIter = std::slice::Iter<'a, SessionScope<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
