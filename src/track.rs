//! Per-track position history.
//!
//! - `TrackHistory`: bounded ring buffer of `(center, timestamp)` samples for one track.
//! - `TrackHistoryStore`: all live tracks for one engine, with TTL eviction.
//!
//! Histories are size-capped per track and dropped once a track has been unseen
//! for longer than the configured TTL, so track-id churn cannot grow memory
//! without bound.

use std::collections::{HashMap, VecDeque};

use crate::detect::{distance, Point, TrackId};

/// Default per-track capacity (10 seconds at 30 fps).
pub const DEFAULT_HISTORY_CAPACITY: usize = 300;

/// Minimum samples before a track's motion is judged.
const MOVING_MIN_SAMPLES: usize = 5;
/// Displacement over the window, as a fraction of body height, that counts as moving.
const MOVING_HEIGHT_FRACTION: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSample {
    pub center: Point,
    pub timestamp: f64,
}

#[derive(Clone, Debug)]
pub struct TrackHistory {
    samples: VecDeque<TrackSample>,
    capacity: usize,
    last_seen: f64,
}

impl TrackHistory {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
            last_seen: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, sample: TrackSample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.last_seen = sample.timestamp;
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&TrackSample> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&TrackSample> {
        self.samples.back()
    }

    pub fn last_seen(&self) -> f64 {
        self.last_seen
    }

    pub fn samples(&self) -> impl Iterator<Item = &TrackSample> + '_ {
        self.samples.iter()
    }

    /// Seconds between the oldest and newest retained sample.
    pub fn span_secs(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    /// Straight-line distance between the oldest and newest retained sample.
    pub fn displacement(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => distance(first.center, last.center),
            _ => 0.0,
        }
    }

    /// True when the track moved more than 20% of `body_height` over the window.
    /// Short histories are treated as stationary.
    pub fn is_moving(&self, body_height: f64) -> bool {
        if self.samples.len() < MOVING_MIN_SAMPLES {
            return false;
        }
        self.displacement() > body_height * MOVING_HEIGHT_FRACTION
    }
}

/// Owned by a single engine; callers serialize access through it.
#[derive(Clone, Debug)]
pub struct TrackHistoryStore {
    tracks: HashMap<TrackId, TrackHistory>,
    /// Time-ordered `(seen_at, id)` touches; stale entries are skipped on pop.
    eviction_queue: VecDeque<(f64, TrackId)>,
    capacity: usize,
    ttl_secs: f64,
}

impl TrackHistoryStore {
    pub fn new(capacity: usize, ttl_secs: f64) -> Self {
        Self {
            tracks: HashMap::new(),
            eviction_queue: VecDeque::new(),
            capacity: capacity.max(1),
            ttl_secs,
        }
    }

    pub fn record(&mut self, track_id: TrackId, center: Point, timestamp: f64) {
        let capacity = self.capacity;
        self.tracks
            .entry(track_id)
            .or_insert_with(|| TrackHistory::new(capacity))
            .push(TrackSample { center, timestamp });
        self.eviction_queue.push_back((timestamp, track_id));
    }

    /// Drop tracks unseen for more than the TTL. Returns how many were evicted.
    pub fn evict_stale(&mut self, now: f64) -> usize {
        let cutoff = now - self.ttl_secs;
        let mut evicted = 0;
        while let Some(&(seen_at, track_id)) = self.eviction_queue.front() {
            if seen_at >= cutoff {
                break;
            }
            self.eviction_queue.pop_front();
            let stale = self
                .tracks
                .get(&track_id)
                .is_some_and(|history| history.last_seen() < cutoff);
            if stale {
                self.tracks.remove(&track_id);
                evicted += 1;
                log::debug!("evicted track {} (unseen since {:.2}s)", track_id, seen_at);
            }
        }
        evicted
    }

    pub fn get(&self, track_id: TrackId) -> Option<&TrackHistory> {
        self.tracks.get(&track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn ttl_secs(&self) -> f64 {
        self.ttl_secs
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.eviction_queue.clear();
    }
}

impl Default for TrackHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, 10.0)
    }
}
