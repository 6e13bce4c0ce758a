//! Channel store boundary.
//!
//! A scan ends with one bulk merge of the discovered channels into a
//! [`ChannelStore`]. Records are matched by original network id, transport
//! stream id, service id and delivery source; the store never sees the
//! intermediate transponder sets.

use std::fmt;

use dvbscan_protocol::{Channel, Source};

use crate::context::Setup;

/// What a merge may do to the stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Delete stored channels of the scanned source that were not seen.
    pub remove_invalid: bool,
    /// Rewrite stored channels whose parameters changed.
    pub update_existing: bool,
    /// Add channels not stored yet.
    pub append_new: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            remove_invalid: false,
            update_existing: false,
            append_new: true,
        }
    }
}

impl From<&Setup> for MergePolicy {
    fn from(setup: &Setup) -> Self {
        Self {
            remove_invalid: setup.remove_invalid,
            update_existing: setup.update_existing,
            append_new: setup.append_new,
        }
    }
}

/// Counts of a finished merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeResult {
    pub removed: usize,
    pub updated: usize,
    pub appended: usize,
}

impl fmt::Display for MergeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new, {} updated, {} removed",
            self.appended, self.updated, self.removed
        )
    }
}

/// Changes a merge applies, as indices into the stored list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    /// Ascending.
    pub remove: Vec<usize>,
    pub update: Vec<(usize, Channel)>,
    pub append: Vec<Channel>,
}

impl MergePlan {
    pub fn result(&self) -> MergeResult {
        MergeResult {
            removed: self.remove.len(),
            updated: self.update.len(),
            appended: self.append.len(),
        }
    }
}

fn same_service(a: &Channel, b: &Channel) -> bool {
    a.onid == b.onid && a.tid == b.tid && a.sid == b.sid && a.source == b.source
}

/// Work out the changes that merge `discovered` into `stored`.
pub fn plan_merge(stored: &[Channel], discovered: &[Channel], policy: &MergePolicy) -> MergePlan {
    let mut plan = MergePlan::default();
    // only the source that was actually scanned may lose channels
    let scanned_source: Option<Source> = discovered.first().map(|c| c.source);

    for (i, old) in stored.iter().enumerate() {
        match discovered.iter().find(|n| same_service(old, n)) {
            None => {
                if policy.remove_invalid && scanned_source == Some(old.source) {
                    log::debug!("ChannelStore: remove invalid channel '{}'", old.to_vdr_line());
                    plan.remove.push(i);
                }
            }
            Some(n) => {
                if policy.update_existing && n.to_vdr_line() != old.to_vdr_line() {
                    log::debug!("ChannelStore: update channel '{}'", n.to_vdr_line());
                    plan.update.push((i, n.clone()));
                }
            }
        }
    }

    if policy.append_new {
        for n in discovered {
            let stored_already = stored.iter().any(|old| same_service(old, n));
            let queued_already = plan.append.iter().any(|c| same_service(c, n));
            if !stored_already && !queued_already {
                log::debug!("ChannelStore: add channel '{}'", n.to_vdr_line());
                plan.append.push(n.clone());
            }
        }
    }
    plan
}

/// Persistent channel list.
pub trait ChannelStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn channels(&self) -> Result<Vec<Channel>, Self::Error>;

    /// Apply `discovered` under `policy`.
    fn merge(&mut self, discovered: &[Channel], policy: &MergePolicy) -> Result<MergeResult, Self::Error>;
}

/// Channel list kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    channels: Vec<Channel>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn into_channels(self) -> Vec<Channel> {
        self.channels
    }
}

impl ChannelStore for MemoryStore {
    type Error = std::convert::Infallible;

    fn channels(&self) -> Result<Vec<Channel>, Self::Error> {
        Ok(self.channels.clone())
    }

    fn merge(&mut self, discovered: &[Channel], policy: &MergePolicy) -> Result<MergeResult, Self::Error> {
        let plan = plan_merge(&self.channels, discovered, policy);
        let result = plan.result();

        for (i, channel) in plan.update {
            self.channels[i] = channel;
        }
        for i in plan.remove.into_iter().rev() {
            self.channels.remove(i);
        }
        self.channels.extend(plan.append);
        Ok(result)
    }
}
