//! Configured SSID watchlist matching for spoof / evil-twin alerting.
//!
//! A watchlist entry lives independently of any device record: it is
//! configured, not traffic-derived, and is consulted on the per-frame hot
//! path against freshly observed SSID/MAC pairs.

use std::cell::RefCell;
use std::collections::BTreeSet;

use parking_lot::ReentrantMutex;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::mac::MacAddr;
use crate::schema::TrackedComponent;

struct WatchlistState {
    group_name: String,
    pattern: Option<String>,
    compiled: Option<Regex>,
    allowed_macs: BTreeSet<MacAddr>,
}

/// One watchlist entry: a compiled SSID pattern plus the MACs allowed to
/// use matching SSIDs.
///
/// Reconfiguration and matching can run concurrently; both serialize
/// through one reentrant lock per entry, so a match issued from a context
/// already holding the lock (alert callbacks fired during reconfiguration)
/// doesn't deadlock. The compiled pattern is cached; matching never
/// re-parses the pattern text.
pub struct SsidWatchlist {
    state: ReentrantMutex<RefCell<WatchlistState>>,
}

impl SsidWatchlist {
    pub fn new(group_name: &str) -> Self {
        SsidWatchlist {
            state: ReentrantMutex::new(RefCell::new(WatchlistState {
                group_name: group_name.to_owned(),
                pattern: None,
                compiled: None,
                allowed_macs: BTreeSet::new(),
            })),
        }
    }

    pub fn group_name(&self) -> String {
        self.state.lock().borrow().group_name.clone()
    }

    pub fn pattern(&self) -> Option<String> {
        self.state.lock().borrow().pattern.clone()
    }

    /// Install a new pattern. Compilation is the validation: an invalid
    /// pattern is rejected with [`TrackerError::InvalidPattern`] and the
    /// previously active pattern stays in effect. The matcher is never
    /// left half-updated.
    pub fn set_pattern(&self, pattern: &str) -> Result<()> {
        let compiled = Regex::new(pattern).map_err(|source| {
            tracing::warn!(%pattern, %source, "rejecting invalid watchlist pattern");
            TrackerError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            }
        })?;

        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.pattern = Some(pattern.to_owned());
        state.compiled = Some(compiled);
        tracing::debug!(group = %state.group_name, %pattern, "watchlist pattern updated");
        Ok(())
    }

    /// Replace the exempt set wholesale.
    pub fn set_allowed_macs(&self, macs: Vec<MacAddr>) {
        let guard = self.state.lock();
        guard.borrow_mut().allowed_macs = macs.into_iter().collect();
    }

    pub fn add_allowed_mac(&self, mac: MacAddr) {
        let guard = self.state.lock();
        guard.borrow_mut().allowed_macs.insert(mac);
    }

    /// True iff the configured pattern matches `ssid` and `mac` is not in
    /// the exempt set. With no pattern configured nothing matches.
    pub fn matches(&self, ssid: &str, mac: MacAddr) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        if state.allowed_macs.contains(&mac) {
            return false;
        }
        match state.compiled.as_ref() {
            Some(re) => re.is_match(ssid),
            None => false,
        }
    }

    /// Point-in-time copy of the configuration, for persistence or
    /// serialization to clients.
    pub fn config(&self) -> WatchlistConfig {
        let guard = self.state.lock();
        let state = guard.borrow();
        WatchlistConfig {
            group_name: state.group_name.clone(),
            pattern: state.pattern.clone(),
            allowed_macs: state.allowed_macs.iter().copied().collect(),
        }
    }

    /// Rebuild a matcher from a stored configuration. A stored pattern that
    /// no longer compiles is a configuration error, same as `set_pattern`.
    pub fn from_config(config: WatchlistConfig) -> Result<Self> {
        let watchlist = SsidWatchlist::new(&config.group_name);
        if let Some(pattern) = config.pattern.as_deref() {
            watchlist.set_pattern(pattern)?;
        }
        watchlist.set_allowed_macs(config.allowed_macs);
        Ok(watchlist)
    }
}

/// Serializable snapshot of one watchlist entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistConfig {
    #[serde(rename = "dot11.ssidalert.group_name")]
    pub group_name: String,
    #[serde(rename = "dot11.ssidalert.regex", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "dot11.ssidalert.allowed_macs")]
    pub allowed_macs: Vec<MacAddr>,
}

impl TrackedComponent for WatchlistConfig {
    const RECORD_TYPE: &'static str = "dot11.ssidalert";
    const FIELDS: &'static [&'static str] = &[
        "dot11.ssidalert.group_name",
        "dot11.ssidalert.regex",
        "dot11.ssidalert.allowed_macs",
    ];
}
