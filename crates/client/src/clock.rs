//! Per-entity playback clock.
//!
//! A closed-loop rate controller over the snapshot buffer: displayed time
//! advances by the frame's wall-clock `dt`, slowed down near the edge of the
//! buffered data and sped up when a backlog builds, so playback stays about
//! one frame behind the newest arrival without stepping or freezing.

use std::f64::consts::PI;

use crate::config::PlaybackConfig;
use crate::field::Fields;
use crate::geometry::{clamped, inverse_lerp};
use crate::snapshot::SnapshotBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// No start event yet; no displayed time exists.
    Unstarted,
    /// One snapshot buffered; shown statically.
    AwaitingSecondSnapshot,
    /// At least two snapshots; blending between the front pair.
    Interpolating,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    tuning: PlaybackConfig,
    /// Virtual time currently shown (ms). `None` until started.
    displayed: Option<f64>,
    /// Inverse-lerp of `displayed` between snapshot 0 and 1.
    fraction: f32,
}

impl PlaybackClock {
    pub fn new(tuning: PlaybackConfig) -> Self {
        Self {
            tuning,
            displayed: None,
            fraction: 0.0,
        }
    }

    pub fn state(&self, buffer: &SnapshotBuffer) -> ClockState {
        match (self.displayed, buffer.len()) {
            (None, _) => ClockState::Unstarted,
            (Some(_), 0 | 1) => ClockState::AwaitingSecondSnapshot,
            (Some(_), _) => ClockState::Interpolating,
        }
    }

    #[inline]
    pub fn displayed_time(&self) -> Option<f64> {
        self.displayed
    }

    #[inline]
    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    /// Begin playback at the oldest buffered snapshot.
    pub fn start(&mut self, buffer: &SnapshotBuffer) {
        if self.displayed.is_some() {
            return;
        }
        if let Ok(front) = buffer.front() {
            self.displayed = Some(front.timestamp);
            self.fraction = 0.0;
        }
    }

    /// Jump straight to `timestamp`, e.g. after the buffer was collapsed.
    /// Does nothing before the clock started.
    pub fn jump_to(&mut self, timestamp: f64) {
        if let Some(current) = self.displayed {
            self.displayed = Some(current.max(timestamp));
            self.fraction = 0.0;
        }
    }

    /// Multiplier applied to this frame's advance.
    ///
    /// `buffered` is the snapshot count, `offset` how far displayed time
    /// trails `now` (ms).
    pub fn rate_scale(&self, buffered: usize, offset: f64) -> f64 {
        let t = &self.tuning;
        match buffered {
            0 | 1 => 0.0,
            2 if offset < t.slowdown_window_ms => {
                // Negative offsets would run the clock backwards.
                (PI * offset / t.slowdown_period_ms).sin().max(0.0)
            }
            2 => 1.0,
            _ if offset > t.target_latency_ms => {
                let behind = (offset - t.target_latency_ms) / t.catchup_scale_ms;
                1.0 + behind * behind
            }
            _ => 1.0,
        }
    }

    /// Advance one frame.
    ///
    /// `dt` is the frame's wall-clock duration in seconds and `now` the
    /// current arrival time (ms). Evicts snapshots playback moved past,
    /// applying their queued writes to `fields`.
    pub fn tick(&mut self, buffer: &mut SnapshotBuffer, fields: &mut Fields, dt: f64, now: f64) {
        buffer.invalidate_cache();

        let Some(displayed) = self.displayed else {
            return;
        };
        let Ok(newest) = buffer.newest().map(|s| s.timestamp) else {
            return;
        };

        if buffer.len() == 1 {
            self.displayed = Some(displayed.max(newest));
            self.fraction = 0.0;
            return;
        }

        let offset = now - displayed;
        let advance = (dt * 1000.0).max(0.0) * self.rate_scale(buffer.len(), offset);
        let next = clamped(displayed + advance, 0.0, newest).max(displayed);
        self.displayed = Some(next);

        buffer.advance(next, fields);

        self.fraction = match buffer.bracket() {
            Some((from, to)) => inverse_lerp(from, to, next).clamp(0.0, 1.0) as f32,
            None => 0.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff;
    use crate::field::{FieldSpec, FieldValue, Schema, blend, decode};
    use glam::Vec2;
    use serde_json::json;

    static FIELDS: [FieldSpec; 2] = [
        FieldSpec::lerped("pos", decode::vec2, blend::vec2),
        FieldSpec::immediate("face", Some(decode::text)),
    ];
    static SCHEMA: Schema = Schema::new(&FIELDS);

    fn push(buffer: &mut SnapshotBuffer, fields: &mut Fields, x: f32, at: f64) {
        let raw = json!({"pos": [x, 0.0]});
        let diff = diff::decode(&SCHEMA, "test", raw.as_object().unwrap()).unwrap();
        buffer.append(diff, at, fields);
    }

    fn started(created: f64) -> (PlaybackClock, SnapshotBuffer, Fields) {
        let mut fields = Fields::new();
        let raw = json!({"pos": [0.0, 0.0]});
        let initial = diff::decode(&SCHEMA, "test", raw.as_object().unwrap()).unwrap();
        let buffer = SnapshotBuffer::seed(&SCHEMA, "test", initial, created, &mut fields).unwrap();
        let mut clock = PlaybackClock::new(PlaybackConfig::default());
        assert_eq!(clock.state(&buffer), ClockState::Unstarted);
        clock.start(&buffer);
        (clock, buffer, fields)
    }

    #[test]
    fn test_start_at_seed_timestamp() {
        let (clock, buffer, _) = started(40.0);
        assert_eq!(clock.displayed_time(), Some(40.0));
        assert_eq!(buffer.front().unwrap().timestamp, 40.0);
        assert_eq!(clock.state(&buffer), ClockState::AwaitingSecondSnapshot);
    }

    #[test]
    fn test_start_after_early_update_stays_ordered() {
        let mut fields = Fields::new();
        let raw = json!({"pos": [0.0, 0.0]});
        let initial = diff::decode(&SCHEMA, "test", raw.as_object().unwrap()).unwrap();
        let mut buffer = SnapshotBuffer::seed(&SCHEMA, "test", initial, 100.0, &mut fields).unwrap();
        push(&mut buffer, &mut fields, 10.0, 110.0);

        let mut clock = PlaybackClock::new(PlaybackConfig::default());
        clock.start(&buffer);
        assert_eq!(clock.displayed_time(), Some(100.0));

        clock.tick(&mut buffer, &mut fields, 0.016, 116.0);
        let displayed = clock.displayed_time().unwrap();
        assert!(displayed > 100.0 && displayed <= 110.0, "{}", displayed);
        assert!(clock.fraction() > 0.0);
    }

    #[test]
    fn test_unstarted_tick_is_noop() {
        let mut fields = Fields::new();
        let raw = json!({"pos": [0.0, 0.0]});
        let initial = diff::decode(&SCHEMA, "test", raw.as_object().unwrap()).unwrap();
        let mut buffer = SnapshotBuffer::seed(&SCHEMA, "test", initial, 0.0, &mut fields).unwrap();
        let mut clock = PlaybackClock::new(PlaybackConfig::default());
        clock.tick(&mut buffer, &mut fields, 0.016, 100.0);
        assert_eq!(clock.displayed_time(), None);
    }

    #[test]
    fn test_single_snapshot_holds_still() {
        let (mut clock, mut buffer, mut fields) = started(0.0);
        clock.tick(&mut buffer, &mut fields, 0.5, 500.0);
        assert_eq!(clock.displayed_time(), Some(0.0));
        assert_eq!(clock.fraction(), 0.0);
    }

    #[test]
    fn test_rate_scale_curve() {
        let clock = PlaybackClock::new(PlaybackConfig::default());
        assert_eq!(clock.rate_scale(1, 500.0), 0.0);
        assert!((clock.rate_scale(2, 50.0) - (PI / 4.0).sin()).abs() < 1e-9);
        assert_eq!(clock.rate_scale(2, 0.0), 0.0);
        assert_eq!(clock.rate_scale(2, -20.0), 0.0);
        assert_eq!(clock.rate_scale(2, 150.0), 1.0);
        assert_eq!(clock.rate_scale(3, 20.0), 1.0);
        assert!((clock.rate_scale(3, 1033.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolates_between_front_pair() {
        let (mut clock, mut buffer, mut fields) = started(0.0);
        push(&mut buffer, &mut fields, 10.0, 100.0);
        assert_eq!(clock.state(&buffer), ClockState::Interpolating);

        // Offset 200ms >= window: full speed, 50ms advance.
        clock.tick(&mut buffer, &mut fields, 0.05, 200.0);
        assert_eq!(clock.displayed_time(), Some(50.0));
        assert!((clock.fraction() - 0.5).abs() < 1e-6);
        assert_eq!(
            buffer.value_at("pos", clock.fraction()).unwrap(),
            FieldValue::Vec2(Vec2::new(5.0, 0.0))
        );
    }

    #[test]
    fn test_decelerates_near_data_edge() {
        let (mut clock, mut buffer, mut fields) = started(0.0);
        push(&mut buffer, &mut fields, 10.0, 100.0);

        // Offset 50ms: advance scaled by sin(pi/4).
        clock.tick(&mut buffer, &mut fields, 0.04, 50.0);
        let expected = 40.0 * (PI / 4.0).sin();
        assert!((clock.displayed_time().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_clamps_to_newest() {
        let (mut clock, mut buffer, mut fields) = started(0.0);
        push(&mut buffer, &mut fields, 10.0, 100.0);
        clock.tick(&mut buffer, &mut fields, 5.0, 10_000.0);
        assert_eq!(clock.displayed_time(), Some(100.0));
        assert_eq!(clock.fraction(), 1.0);
    }

    #[test]
    fn test_backlog_catches_up_and_evicts() {
        let (mut clock, mut buffer, mut fields) = started(0.0);
        push(&mut buffer, &mut fields, 1.0, 100.0);
        push(&mut buffer, &mut fields, 2.0, 200.0);
        push(&mut buffer, &mut fields, 3.0, 300.0);

        // One catch-up scale past the target doubles the advance.
        clock.tick(&mut buffer, &mut fields, 0.075, 1033.0);
        assert!((clock.displayed_time().unwrap() - 150.0).abs() < 1e-9);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.front().unwrap().timestamp, 100.0);
        assert!((clock.fraction() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_never_goes_backwards() {
        let (mut clock, mut buffer, mut fields) = started(100.0);
        push(&mut buffer, &mut fields, 1.0, 200.0);
        // `now` earlier than displayed time: negative offset.
        clock.tick(&mut buffer, &mut fields, 0.016, 50.0);
        assert_eq!(clock.displayed_time(), Some(100.0));
    }

    #[test]
    fn test_jump_to_is_monotonic() {
        let (mut clock, _, _) = started(100.0);
        clock.jump_to(50.0);
        assert_eq!(clock.displayed_time(), Some(100.0));
        clock.jump_to(300.0);
        assert_eq!(clock.displayed_time(), Some(300.0));

        let mut idle = PlaybackClock::new(PlaybackConfig::default());
        idle.jump_to(300.0);
        assert_eq!(idle.displayed_time(), None);
    }
}
