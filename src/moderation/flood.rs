//! Flood detection over per-member sliding windows.
//!
//! Each (group, user) pair keeps the timestamps of its last `N` messages.
//! A full window whose consecutive gaps are all below the burst interval is
//! a flood. After a throttle the pair is ignored until the cool-down has
//! passed, so a member still serving a mute is not punished again.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::ModerationSettings;

/// Outcome of observing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    NoAction,
    /// Mute the sender for this long.
    Throttle(Duration),
}

/// Recent message times of one member in one group.
#[derive(Debug, Clone)]
struct FloodWindow {
    timestamps: VecDeque<DateTime<Utc>>,
    last_throttle: Option<DateTime<Utc>>,
    last_seen: DateTime<Utc>,
}

impl FloodWindow {
    fn new(capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(capacity),
            last_throttle: None,
            last_seen: now,
        }
    }

    fn cooling_down(&self, now: DateTime<Utc>, cooldown: TimeDelta) -> bool {
        self.last_throttle
            .is_some_and(|throttled| now - throttled < cooldown)
    }

    /// Append, evicting the oldest entry beyond `capacity`.
    fn push(&mut self, at: DateTime<Utc>, capacity: usize) {
        self.timestamps.push_back(at);
        while self.timestamps.len() > capacity {
            self.timestamps.pop_front();
        }
    }

    /// Full window with every gap strictly below `interval`.
    fn is_burst(&self, capacity: usize, interval: TimeDelta) -> bool {
        if self.timestamps.len() < capacity {
            return false;
        }

        let recent = self.timestamps.range(self.timestamps.len() - capacity..);
        recent
            .clone()
            .zip(recent.skip(1))
            .all(|(earlier, later)| *later - *earlier < interval)
    }

    fn is_idle(&self, now: DateTime<Utc>, idle: TimeDelta, cooldown: TimeDelta) -> bool {
        now - self.last_seen >= idle && !self.cooling_down(now, cooldown)
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

/// Per-(group, user) flood tracker.
///
/// Observations for the same pair are serialised by the map entry guard;
/// different pairs do not contend.
pub struct FloodDetector {
    windows: DashMap<(String, String), FloodWindow>,
    sample_count: usize,
    burst_interval: TimeDelta,
    cooldown: Duration,
    idle_evict: Option<TimeDelta>,
    monitored_groups: HashSet<String>,
    /// Our own user id; its messages are never counted.
    self_id: Option<String>,
    last_sweep: Mutex<Option<DateTime<Utc>>>,
}

impl FloodDetector {
    pub fn new(settings: &ModerationSettings, self_id: Option<String>) -> Self {
        Self {
            windows: DashMap::new(),
            sample_count: settings.flood_sample_count,
            burst_interval: to_delta(settings.flood_burst_interval),
            cooldown: settings.flood_cooldown,
            idle_evict: (!settings.flood_idle_evict.is_zero())
                .then(|| to_delta(settings.flood_idle_evict)),
            monitored_groups: settings.monitored_groups.clone(),
            self_id,
            last_sweep: Mutex::new(None),
        }
    }

    /// Record a message and decide whether its sender is flooding.
    pub fn observe(
        &self,
        group: &str,
        user: &str,
        at: DateTime<Utc>,
        has_content: bool,
    ) -> ThrottleDecision {
        if self.self_id.as_deref() == Some(user)
            || self.sample_count == 0
            || self.cooldown.is_zero()
            || !has_content
        {
            return ThrottleDecision::NoAction;
        }
        if !self.monitored_groups.contains(group) {
            return ThrottleDecision::NoAction;
        }

        let decision = self.observe_window(group, user, at);
        self.maybe_sweep(at);
        decision
    }

    fn observe_window(&self, group: &str, user: &str, at: DateTime<Utc>) -> ThrottleDecision {
        let cooldown = to_delta(self.cooldown);

        let mut window = match self.windows.entry((group.to_string(), user.to_string())) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => entry.insert(FloodWindow::new(self.sample_count, at)),
        };
        window.last_seen = at;

        if window.cooling_down(at, cooldown) {
            return ThrottleDecision::NoAction;
        }

        window.push(at, self.sample_count);
        if !window.is_burst(self.sample_count, self.burst_interval) {
            return ThrottleDecision::NoAction;
        }

        // Marked while the entry guard is held, before anyone acts on the
        // decision, so a concurrent message cannot produce a second throttle.
        window.last_throttle = Some(at);
        window.timestamps.clear();

        debug!(group, user, "Flood burst detected");
        ThrottleDecision::Throttle(self.cooldown)
    }

    /// Sweep idle windows at most once per idle period.
    fn maybe_sweep(&self, now: DateTime<Utc>) {
        let Some(idle) = self.idle_evict else {
            return;
        };

        {
            let mut last = self.last_sweep.lock();
            if let Some(previous) = *last
                && now - previous < idle
            {
                return;
            }
            *last = Some(now);
        }

        let evicted = self.evict_idle(now, idle);
        if evicted > 0 {
            debug!(evicted, remaining = self.windows.len(), "Evicted idle flood windows");
        }
    }

    /// Drop windows idle for at least `idle` whose cool-down has expired.
    pub fn evict_idle(&self, now: DateTime<Utc>, idle: TimeDelta) -> usize {
        let cooldown = to_delta(self.cooldown);
        let before = self.windows.len();
        self.windows
            .retain(|_, window| !window.is_idle(now, idle, cooldown));
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked (group, user) pairs.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

impl std::fmt::Debug for FloodDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloodDetector")
            .field("tracked", &self.tracked())
            .field("sample_count", &self.sample_count)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}
