//! Diff application engine.
//!
//! Decodes a raw partial update against a schema, splits it into lerp-tracked
//! and immediate values, and merges it into a snapshot buffer.

use protocol::Diff;
use tracing::trace;

use crate::error::EngineError;
use crate::field::{FieldSpec, FieldValue, Fields, Schema};
use crate::snapshot::{Snapshot, SnapshotBuffer};

/// An immediate value waiting to be applied through its field's applier.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub spec: &'static FieldSpec,
    pub value: FieldValue,
}

/// A diff after normalization, partitioned by field kind.
#[derive(Debug, Clone, Default)]
pub struct DecodedDiff {
    pub lerped: Fields,
    /// Immediate values in schema order.
    pub immediate: Vec<PendingWrite>,
}

impl DecodedDiff {
    pub fn is_empty(&self) -> bool {
        self.lerped.is_empty() && self.immediate.is_empty()
    }
}

/// Normalize every schema field present in `raw`.
///
/// A field that fails to decode rejects the whole diff, so an entity never
/// shows half of an update. Keys outside the schema are ignored.
pub fn decode(schema: &'static Schema, type_id: &'static str, raw: &Diff) -> Result<DecodedDiff, EngineError> {
    let mut decoded = DecodedDiff::default();

    for spec in schema.fields() {
        let Some(wire) = raw.get(spec.name) else {
            continue;
        };
        let value = spec.decode_value(wire).map_err(|e| EngineError::Decode {
            type_id,
            field: spec.name,
            expected: e.expected,
        })?;

        if spec.is_lerped() {
            decoded.lerped.insert(spec.name, value);
        } else {
            decoded.immediate.push(PendingWrite { spec, value });
        }
    }

    if tracing::enabled!(tracing::Level::TRACE) {
        for key in raw.keys() {
            if key != protocol::TYPE_KEY && schema.get(key).is_none() {
                trace!("Ignoring field '{}' not in schema of '{}'", key, type_id);
            }
        }
    }

    Ok(decoded)
}

/// Apply immediate writes in order.
pub fn apply_writes(fields: &mut Fields, writes: Vec<PendingWrite>) {
    for write in writes {
        fields.apply(write.spec, write.value);
    }
}

/// Apply a whole decoded diff directly, for entities that do not interpolate.
pub fn apply_direct(fields: &mut Fields, diff: DecodedDiff) {
    for (name, value) in diff.lerped.iter() {
        fields.insert(name, value.clone());
    }
    apply_writes(fields, diff.immediate);
}

impl SnapshotBuffer {
    /// Merge a decoded diff that arrived at `arrival` (ms).
    ///
    /// An arrival equal to the newest snapshot's timestamp extends that
    /// snapshot in place: lerp values overwrite, immediate values join its
    /// queue, or go straight onto `fields` when it is the only snapshot.
    /// Any other arrival starts a new snapshot whose lerp values are the
    /// previous newest ones overlaid with this diff, and whose queue holds
    /// only this diff's immediate values.
    ///
    /// Arrival times are expected to be non-decreasing; a late arrival is
    /// folded into the newest snapshot.
    pub fn append(&mut self, diff: DecodedDiff, arrival: f64, fields: &mut Fields) {
        let only_snapshot = self.snapshots.len() == 1;
        let Some(newest) = self.snapshots.back_mut() else {
            return;
        };

        if arrival <= newest.timestamp {
            if arrival < newest.timestamp {
                trace!(
                    "Late diff for '{}' at {:.1}ms folded into snapshot at {:.1}ms",
                    self.type_id, arrival, newest.timestamp
                );
            }
            newest.lerped.overlay(&diff.lerped);
            if only_snapshot {
                apply_writes(fields, diff.immediate);
            } else {
                newest
                    .other
                    .get_or_insert_with(Vec::new)
                    .extend(diff.immediate);
            }
            if !diff.lerped.is_empty() {
                self.invalidate_cache();
            }
            return;
        }

        let mut lerped = newest.lerped.clone();
        lerped.overlay(&diff.lerped);
        self.snapshots.push_back(Snapshot {
            timestamp: arrival,
            lerped,
            other: Some(diff.immediate),
        });
    }
}
