//! Field schemas: which named fields an entity kind carries on the wire, how
//! each is decoded, blended and applied.
//!
//! A schema is a `'static` table attached to the kind. A field is
//! *lerp-tracked* iff it has a blend function; otherwise it is *immediate*
//! and lands on the entity through its applier, or by replacement when it has
//! none.

use glam::Vec2;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::geometry;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f32),
    Vec2(Vec2),
    Text(String),
    /// Named counters (inventory-like state).
    Counts(BTreeMap<String, i64>),
    /// Ordered text lines (act logs).
    Lines(Vec<String>),
    /// Wire value kept verbatim (field without a normalizer).
    Raw(Value),
}

impl FieldValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            FieldValue::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_counts(&self) -> Option<&BTreeMap<String, i64>> {
        match self {
            FieldValue::Counts(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_lines(&self) -> Option<&[String]> {
        match self {
            FieldValue::Lines(l) => Some(l),
            _ => None,
        }
    }
}

/// A normalizer rejected a wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    /// Human description of the accepted shape.
    pub expected: &'static str,
}

/// Converts a raw wire value into a typed value.
pub type Normalizer = fn(&Value) -> Result<FieldValue, DecodeError>;

/// Blends `(start, end, fraction)`. The fraction is always within `[0, 1]`.
pub type LerpFn = fn(&FieldValue, &FieldValue, f32) -> FieldValue;

/// Merges a decoded value into the entity's fields: `(fields, value, name)`.
pub type Applier = fn(&mut Fields, FieldValue, &'static str);

/// One row of a schema table.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub decode: Option<Normalizer>,
    pub lerp: Option<LerpFn>,
    pub apply: Option<Applier>,
}

impl FieldSpec {
    /// Immediate field with replacement semantics.
    pub const fn immediate(name: &'static str, decode: Option<Normalizer>) -> Self {
        Self {
            name,
            decode,
            lerp: None,
            apply: None,
        }
    }

    /// Interpolated field.
    pub const fn lerped(name: &'static str, decode: Normalizer, lerp: LerpFn) -> Self {
        Self {
            name,
            decode: Some(decode),
            lerp: Some(lerp),
            apply: None,
        }
    }

    /// Immediate field whose wire value is a delta merged by `apply`.
    pub const fn merged(name: &'static str, decode: Normalizer, apply: Applier) -> Self {
        Self {
            name,
            decode: Some(decode),
            lerp: None,
            apply: Some(apply),
        }
    }

    #[inline]
    pub fn is_lerped(&self) -> bool {
        self.lerp.is_some()
    }

    /// Run the normalizer, or keep the wire value verbatim.
    pub fn decode_value(&self, raw: &Value) -> Result<FieldValue, DecodeError> {
        match self.decode {
            Some(decode) => decode(raw),
            None => Ok(FieldValue::Raw(raw.clone())),
        }
    }
}

/// Static field table of an entity kind.
#[derive(Debug)]
pub struct Schema {
    fields: &'static [FieldSpec],
}

impl Schema {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn lerped(&self) -> impl Iterator<Item = &'static FieldSpec> + use<> {
        self.fields.iter().filter(|spec| spec.is_lerped())
    }

    pub fn has_lerps(&self) -> bool {
        self.fields.iter().any(FieldSpec::is_lerped)
    }

    pub fn is_lerped(&self, name: &str) -> bool {
        self.get(name).is_some_and(FieldSpec::is_lerped)
    }
}

/// Field name -> decoded value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(HashMap<&'static str, FieldValue>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: &'static str, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(name, value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.0.iter().map(|(name, value)| (*name, value))
    }

    /// Copy every entry of `other` over this map.
    pub fn overlay(&mut self, other: &Fields) {
        for (name, value) in other.iter() {
            self.0.insert(name, value.clone());
        }
    }

    /// Apply an immediate value through the field's applier, or replace.
    pub fn apply(&mut self, spec: &'static FieldSpec, value: FieldValue) {
        match spec.apply {
            Some(apply) => apply(self, value, spec.name),
            None => {
                self.0.insert(spec.name, value);
            }
        }
    }
}

/// Standard normalizers.
pub mod decode {
    use super::*;

    pub fn vec2(raw: &Value) -> Result<FieldValue, DecodeError> {
        geometry::vec2_from_json(raw)
            .map(FieldValue::Vec2)
            .ok_or(DecodeError {
                expected: "an [x, y] number pair",
            })
    }

    pub fn float(raw: &Value) -> Result<FieldValue, DecodeError> {
        raw.as_f64()
            .map(|v| FieldValue::Float(v as f32))
            .ok_or(DecodeError { expected: "a number" })
    }

    pub fn text(raw: &Value) -> Result<FieldValue, DecodeError> {
        raw.as_str()
            .map(|s| FieldValue::Text(s.to_string()))
            .ok_or(DecodeError { expected: "a string" })
    }

    /// `{"name": delta, ...}` with integer deltas.
    pub fn counts(raw: &Value) -> Result<FieldValue, DecodeError> {
        const EXPECTED: DecodeError = DecodeError {
            expected: "an object of integer deltas",
        };
        let object = raw.as_object().ok_or(EXPECTED)?;
        let mut counts = BTreeMap::new();
        for (name, delta) in object {
            counts.insert(name.clone(), delta.as_i64().ok_or(EXPECTED)?);
        }
        Ok(FieldValue::Counts(counts))
    }

    /// A list of strings, or a single string.
    pub fn lines(raw: &Value) -> Result<FieldValue, DecodeError> {
        const EXPECTED: DecodeError = DecodeError {
            expected: "a string or a list of strings",
        };
        match raw {
            Value::String(s) => Ok(FieldValue::Lines(vec![s.clone()])),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or(EXPECTED))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::Lines),
            _ => Err(EXPECTED),
        }
    }
}

/// Standard blend functions.
///
/// Mismatched variants snap to the end value.
pub mod blend {
    use super::*;

    pub fn float(a: &FieldValue, b: &FieldValue, t: f32) -> FieldValue {
        match (a, b) {
            (FieldValue::Float(a), FieldValue::Float(b)) => FieldValue::Float(geometry::lerp(*a, *b, t)),
            _ => b.clone(),
        }
    }

    pub fn vec2(a: &FieldValue, b: &FieldValue, t: f32) -> FieldValue {
        match (a, b) {
            (FieldValue::Vec2(a), FieldValue::Vec2(b)) => FieldValue::Vec2(a.lerp(*b, t)),
            _ => b.clone(),
        }
    }

    /// Shortest-arc rotation blend.
    pub fn angle(a: &FieldValue, b: &FieldValue, t: f32) -> FieldValue {
        match (a, b) {
            (FieldValue::Float(a), FieldValue::Float(b)) => {
                FieldValue::Float(geometry::lerp_angle(*a, *b, t))
            }
            _ => b.clone(),
        }
    }
}

/// Standard appliers.
pub mod apply {
    use super::*;

    /// Most lines an act log keeps.
    pub const MAX_LINES: usize = 32;

    /// Add counter deltas, saturating at the `i64` bounds; counters that drop
    /// to zero or below disappear.
    pub fn merge_counts(fields: &mut Fields, value: FieldValue, name: &'static str) {
        let FieldValue::Counts(deltas) = value else {
            fields.insert(name, value);
            return;
        };
        let mut counts = match fields.get(name) {
            Some(FieldValue::Counts(current)) => current.clone(),
            _ => BTreeMap::new(),
        };
        for (item, delta) in deltas {
            let count = counts.entry(item).or_insert(0);
            *count = count.saturating_add(delta);
        }
        counts.retain(|_, count| *count > 0);
        fields.insert(name, FieldValue::Counts(counts));
    }

    /// Append lines, keeping the newest `MAX_LINES`.
    pub fn append_lines(fields: &mut Fields, value: FieldValue, name: &'static str) {
        let FieldValue::Lines(new_lines) = value else {
            fields.insert(name, value);
            return;
        };
        let mut lines = match fields.get(name) {
            Some(FieldValue::Lines(current)) => current.clone(),
            _ => Vec::new(),
        };
        lines.extend(new_lines);
        if lines.len() > MAX_LINES {
            lines.drain(..lines.len() - MAX_LINES);
        }
        fields.insert(name, FieldValue::Lines(lines));
    }
}
