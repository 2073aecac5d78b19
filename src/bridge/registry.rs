//! Tracker session bookkeeping.
//!
//! Remembers which tracker identities have been seen, whether each has been
//! introduced to the server, and when each last reported battery status.
//! Sessions live for the whole process; the 6-bit identity space caps them at 64.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default battery resend interval.
pub const DEFAULT_TELEMETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum number of distinct trackers on one receiver.
pub const MAX_TRACKERS: usize = 64;

/// Per-tracker session.
#[derive(Debug, Clone)]
pub struct TrackerSession {
    pub tracker_id: u8,
    /// Handshake has been emitted for this tracker
    pub handshake_sent: bool,
    /// Last battery packet, `None` until the first one
    pub last_telemetry: Option<Instant>,
    pub first_seen: Instant,
    pub last_seen: Instant,
    /// Readings observed for this tracker
    pub readings: u64,
}

impl TrackerSession {
    fn new(tracker_id: u8, now: Instant) -> Self {
        Self {
            tracker_id,
            handshake_sent: false,
            last_telemetry: None,
            first_seen: now,
            last_seen: now,
            readings: 0,
        }
    }
}

/// Result of observing a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// First time this identity was seen
    pub is_new_session: bool,
    /// Handshake has not been emitted yet
    pub handshake_pending: bool,
}

/// Registry of tracker sessions.
#[derive(Debug, Default)]
pub struct TrackerRegistry {
    sessions: HashMap<u8, TrackerSession>,
}

impl TrackerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: HashMap::with_capacity(MAX_TRACKERS),
        }
    }

    /// Record a reading from `tracker_id`, creating its session on first sight.
    pub fn observe(&mut self, tracker_id: u8, now: Instant) -> Observation {
        let mut is_new_session = false;
        let session = self.sessions.entry(tracker_id).or_insert_with(|| {
            is_new_session = true;
            TrackerSession::new(tracker_id, now)
        });

        session.last_seen = now;
        session.readings += 1;

        Observation {
            is_new_session,
            handshake_pending: !session.handshake_sent,
        }
    }

    /// Record that the handshake for `tracker_id` went out.
    pub fn mark_handshake_sent(&mut self, tracker_id: u8) {
        if let Some(session) = self.sessions.get_mut(&tracker_id) {
            session.handshake_sent = true;
        }
    }

    /// Whether a battery packet is due for `tracker_id`.
    ///
    /// Due when none has been sent yet or more than `interval` has passed
    /// since the last one. Unknown trackers are never due.
    pub fn due_for_telemetry_resend(
        &self,
        tracker_id: u8,
        now: Instant,
        interval: Duration,
    ) -> bool {
        match self.sessions.get(&tracker_id) {
            Some(session) => match session.last_telemetry {
                Some(last) => now.saturating_duration_since(last) > interval,
                None => true,
            },
            None => false,
        }
    }

    /// Record that a battery packet for `tracker_id` went out at `now`.
    pub fn mark_telemetry_sent(&mut self, tracker_id: u8, now: Instant) {
        if let Some(session) = self.sessions.get_mut(&tracker_id) {
            session.last_telemetry = Some(now);
        }
    }

    /// Get a session by tracker id.
    pub fn get(&self, tracker_id: u8) -> Option<&TrackerSession> {
        self.sessions.get(&tracker_id)
    }

    /// Tracker ids seen so far, ascending.
    pub fn tracker_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of distinct trackers seen.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no tracker has been seen.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
