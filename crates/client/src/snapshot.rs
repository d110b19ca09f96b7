//! Per-entity snapshot buffer.
//!
//! An ordered run of timestamped records of what the server said. Index 0 and
//! 1 bracket the displayed time; anything after is queued future data. The
//! buffer is never empty: it can only be built through [`SnapshotBuffer::seed`]
//! and eviction always leaves at least two snapshots behind.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use crate::diff::{DecodedDiff, PendingWrite, apply_writes};
use crate::error::EngineError;
use crate::field::{FieldValue, Fields, Schema};

/// One timestamped record.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Arrival virtual time (ms).
    pub timestamp: f64,
    /// Every lerp-tracked field of the schema, carried forward when a diff
    /// did not mention it.
    pub lerped: Fields,
    /// Immediate writes applied when playback reaches this snapshot.
    /// `None` once merged into the entity.
    pub other: Option<Vec<PendingWrite>>,
}

/// Interpolated values computed during the current tick.
///
/// Cleared at the start of every tick; a request at a different fraction than
/// the cached one also drops it.
#[derive(Debug, Default)]
struct InterpolationCache {
    fraction: f32,
    values: HashMap<&'static str, FieldValue>,
}

#[derive(Debug)]
pub struct SnapshotBuffer {
    pub(crate) schema: &'static Schema,
    pub(crate) type_id: &'static str,
    pub(crate) snapshots: VecDeque<Snapshot>,
    cache: RefCell<InterpolationCache>,
}

impl SnapshotBuffer {
    /// Build the single starting snapshot from an entity's full initial data.
    ///
    /// Lerp-tracked values become the snapshot, stamped with the arrival time
    /// of the data that created the entity; immediate values are applied
    /// straight onto `fields`.
    pub fn seed(
        schema: &'static Schema,
        type_id: &'static str,
        initial: DecodedDiff,
        timestamp: f64,
        fields: &mut Fields,
    ) -> Result<Self, EngineError> {
        if let Some(missing) = schema.lerped().find(|spec| !initial.lerped.contains(spec.name)) {
            return Err(EngineError::MissingField {
                type_id,
                field: missing.name,
            });
        }

        apply_writes(fields, initial.immediate);

        let mut snapshots = VecDeque::with_capacity(4);
        snapshots.push_back(Snapshot {
            timestamp,
            lerped: initial.lerped,
            other: None,
        });

        Ok(Self {
            schema,
            type_id,
            snapshots,
            cache: RefCell::new(InterpolationCache::default()),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn front(&self) -> Result<&Snapshot, EngineError> {
        self.snapshots.front().ok_or(EngineError::BufferUnderflow)
    }

    pub fn newest(&self) -> Result<&Snapshot, EngineError> {
        self.snapshots.back().ok_or(EngineError::BufferUnderflow)
    }

    /// Timestamps of snapshot 0 and 1, when interpolation is possible.
    pub fn bracket(&self) -> Option<(f64, f64)> {
        match (self.snapshots.front(), self.snapshots.get(1)) {
            (Some(a), Some(b)) => Some((a.timestamp, b.timestamp)),
            _ => None,
        }
    }

    /// Value of a lerp-tracked field at `fraction` between snapshot 0 and 1.
    ///
    /// With a single snapshot its stored value is returned as-is for any
    /// fraction. Results are cached until [`invalidate_cache`] runs.
    ///
    /// [`invalidate_cache`]: SnapshotBuffer::invalidate_cache
    pub fn value_at(&self, name: &str, fraction: f32) -> Result<FieldValue, EngineError> {
        let spec = self
            .schema
            .get(name)
            .ok_or_else(|| EngineError::UnknownField(name.to_string()))?;
        let lerp = spec.lerp.ok_or_else(|| EngineError::NotLerped(name.to_string()))?;
        let fraction = fraction.clamp(0.0, 1.0);

        let mut cache = self.cache.borrow_mut();
        if cache.fraction != fraction {
            cache.values.clear();
            cache.fraction = fraction;
        }
        if let Some(value) = cache.values.get(spec.name) {
            return Ok(value.clone());
        }

        let start = self.front()?.lerped.get(spec.name).ok_or(EngineError::MissingField {
            type_id: self.type_id,
            field: spec.name,
        })?;
        let value = match self.snapshots.get(1) {
            Some(next) => {
                let end = next.lerped.get(spec.name).ok_or(EngineError::MissingField {
                    type_id: self.type_id,
                    field: spec.name,
                })?;
                lerp(start, end, fraction)
            }
            None => start.clone(),
        };

        cache.values.insert(spec.name, value.clone());
        Ok(value)
    }

    /// Drop every cached interpolated value.
    pub fn invalidate_cache(&self) {
        self.cache.borrow_mut().values.clear();
    }

    /// Evict snapshots playback has moved past.
    ///
    /// While more than two snapshots remain and `displayed` is beyond
    /// snapshot 1, the front is dropped and the new front's queued immediate
    /// writes are applied to `fields`. Returns the number evicted.
    pub fn advance(&mut self, displayed: f64, fields: &mut Fields) -> usize {
        let mut evicted = 0;
        while self.snapshots.len() > 2 && displayed > self.snapshots[1].timestamp {
            self.snapshots.pop_front();
            if let Some(writes) = self.snapshots.front_mut().and_then(|front| front.other.take()) {
                apply_writes(fields, writes);
            }
            evicted += 1;
        }
        if evicted > 0 {
            self.invalidate_cache();
        }
        evicted
    }

    /// Collapse to the newest snapshot, applying every queued write in order.
    ///
    /// Returns the newest timestamp.
    pub fn skip_to_newest(&mut self, fields: &mut Fields) -> f64 {
        while self.snapshots.len() > 1 {
            self.snapshots.pop_front();
            if let Some(writes) = self.snapshots.front_mut().and_then(|front| front.other.take()) {
                apply_writes(fields, writes);
            }
        }
        self.invalidate_cache();
        self.snapshots.front().map_or(0.0, |s| s.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff;
    use crate::field::{FieldSpec, apply, blend, decode};
    use glam::Vec2;
    use serde_json::json;

    static FIELDS: [FieldSpec; 3] = [
        FieldSpec::lerped("pos", decode::vec2, blend::vec2),
        FieldSpec::immediate("face", Some(decode::text)),
        FieldSpec::merged("acts", decode::lines, apply::append_lines),
    ];
    static SCHEMA: Schema = Schema::new(&FIELDS);

    fn decoded(raw: serde_json::Value) -> DecodedDiff {
        diff::decode(&SCHEMA, "test", raw.as_object().unwrap()).unwrap()
    }

    fn seeded(fields: &mut Fields) -> SnapshotBuffer {
        SnapshotBuffer::seed(
            &SCHEMA,
            "test",
            decoded(json!({"pos": [0, 0], "face": "o<w>o"})),
            0.0,
            fields,
        )
        .unwrap()
    }

    #[test]
    fn test_seed_applies_immediates_and_keeps_lerps() {
        let mut fields = Fields::new();
        let buffer = seeded(&mut fields);
        assert_eq!(buffer.len(), 1);
        assert_eq!(fields.get("face").unwrap().as_text(), Some("o<w>o"));
        assert!(!fields.contains("pos"));
        assert!(buffer.front().unwrap().other.is_none());
    }

    #[test]
    fn test_seed_requires_every_lerp_field() {
        let mut fields = Fields::new();
        let err = SnapshotBuffer::seed(&SCHEMA, "test", decoded(json!({"face": "o<w>o"})), 0.0, &mut fields)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::MissingField {
                type_id: "test",
                field: "pos"
            }
        );
    }

    #[test]
    fn test_single_snapshot_ignores_fraction() {
        let mut fields = Fields::new();
        let buffer = seeded(&mut fields);
        for fraction in [-1.0, 0.0, 0.5, 1.0, 7.0] {
            buffer.invalidate_cache();
            assert_eq!(
                buffer.value_at("pos", fraction).unwrap(),
                FieldValue::Vec2(Vec2::ZERO)
            );
        }
    }

    #[test]
    fn test_value_at_midpoint() {
        let mut fields = Fields::new();
        let mut buffer = seeded(&mut fields);
        buffer.append(decoded(json!({"pos": [10, 0]})), 100.0, &mut fields);
        assert_eq!(
            buffer.value_at("pos", 0.5).unwrap(),
            FieldValue::Vec2(Vec2::new(5.0, 0.0))
        );
    }

    #[test]
    fn test_value_at_rejects_immediate_and_unknown() {
        let mut fields = Fields::new();
        let buffer = seeded(&mut fields);
        assert_eq!(
            buffer.value_at("face", 0.0),
            Err(EngineError::NotLerped("face".into()))
        );
        assert_eq!(
            buffer.value_at("nope", 0.0),
            Err(EngineError::UnknownField("nope".into()))
        );
    }

    #[test]
    fn test_cache_holds_until_invalidated() {
        let mut fields = Fields::new();
        let mut buffer = seeded(&mut fields);
        buffer.append(decoded(json!({"pos": [10, 0]})), 100.0, &mut fields);
        let first = buffer.value_at("pos", 0.5).unwrap();

        // Rewrite the target behind the cache's back.
        buffer.snapshots[1]
            .lerped
            .insert("pos", FieldValue::Vec2(Vec2::new(20.0, 0.0)));
        assert_eq!(buffer.value_at("pos", 0.5).unwrap(), first);

        buffer.invalidate_cache();
        assert_eq!(
            buffer.value_at("pos", 0.5).unwrap(),
            FieldValue::Vec2(Vec2::new(10.0, 0.0))
        );
    }

    #[test]
    fn test_advance_evicts_front_and_applies_queued_writes() {
        let mut fields = Fields::new();
        let mut buffer = seeded(&mut fields);
        buffer.append(decoded(json!({"pos": [1, 0], "acts": "dug"})), 100.0, &mut fields);
        buffer.append(decoded(json!({"pos": [2, 0]})), 200.0, &mut fields);
        assert_eq!(buffer.len(), 3);
        assert!(fields.get("acts").is_none());

        assert_eq!(buffer.advance(150.0, &mut fields), 1);

        let times: Vec<f64> = buffer.snapshots().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![100.0, 200.0]);
        assert_eq!(fields.get("acts").unwrap().as_lines().unwrap(), ["dug"]);
        assert!(buffer.front().unwrap().other.is_none());
    }

    #[test]
    fn test_advance_keeps_two_snapshots() {
        let mut fields = Fields::new();
        let mut buffer = seeded(&mut fields);
        buffer.append(decoded(json!({"pos": [1, 0]})), 100.0, &mut fields);
        assert_eq!(buffer.advance(1_000.0, &mut fields), 0);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_queued_write_applies_once() {
        let mut fields = Fields::new();
        let mut buffer = seeded(&mut fields);
        buffer.append(decoded(json!({"pos": [1, 0], "acts": "dug"})), 100.0, &mut fields);
        buffer.append(decoded(json!({"pos": [2, 0]})), 200.0, &mut fields);
        buffer.append(decoded(json!({"pos": [3, 0]})), 300.0, &mut fields);

        buffer.advance(150.0, &mut fields);
        buffer.advance(250.0, &mut fields);
        assert_eq!(buffer.len(), 2);
        assert_eq!(fields.get("acts").unwrap().as_lines().unwrap(), ["dug"]);
    }

    #[test]
    fn test_skip_to_newest_applies_all_writes_in_order() {
        let mut fields = Fields::new();
        let mut buffer = seeded(&mut fields);
        buffer.append(decoded(json!({"pos": [1, 0], "acts": "one"})), 100.0, &mut fields);
        buffer.append(decoded(json!({"pos": [2, 0], "acts": "two", "face": "^_^_^"})), 200.0, &mut fields);

        assert_eq!(buffer.skip_to_newest(&mut fields), 200.0);
        assert_eq!(buffer.len(), 1);
        assert_eq!(fields.get("acts").unwrap().as_lines().unwrap(), ["one", "two"]);
        assert_eq!(fields.get("face").unwrap().as_text(), Some("^_^_^"));
        assert_eq!(
            buffer.value_at("pos", 0.3).unwrap(),
            FieldValue::Vec2(Vec2::new(2.0, 0.0))
        );
    }
}
