use client::diff;
use client::field::Fields;
use client::geometry::{lerp_angle, normalize_angle};
use client::kinds::ANT_SCHEMA;
use client::{FieldValue, PlaybackClock, PlaybackConfig, SnapshotBuffer};
use glam::Vec2;
use proptest::prelude::*;
use serde_json::{Map, Value, json};

#[derive(Clone, Debug)]
enum Op {
    /// A diff arriving `gap` ms after the previous one.
    Diff {
        gap: u8,
        pos: Option<(i16, i16)>,
        rot: Option<f32>,
        act: bool,
    },
    /// A frame of `dt_ms`.
    Tick { dt_ms: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (
            prop_oneof![Just(0u8), 1u8..120],
            prop::option::of((any::<i16>(), any::<i16>())),
            prop::option::of(-10.0f32..10.0),
            any::<bool>(),
        )
            .prop_map(|(gap, pos, rot, act)| Op::Diff { gap, pos, rot, act }),
        (0u8..100).prop_map(|dt_ms| Op::Tick { dt_ms }),
    ]
}

fn raw(pos: Option<(i16, i16)>, rot: Option<f32>, act: bool) -> Map<String, Value> {
    let mut raw = Map::new();
    if let Some((x, y)) = pos {
        raw.insert("pos".into(), json!([x, y]));
    }
    if let Some(rot) = rot {
        raw.insert("rot".into(), json!(rot));
    }
    if act {
        raw.insert("acts".into(), json!("waved"));
    }
    raw
}

fn seeded(fields: &mut Fields) -> SnapshotBuffer {
    let initial = diff::decode(&ANT_SCHEMA, "ant", &raw(Some((0, 0)), Some(0.0), false)).unwrap();
    SnapshotBuffer::seed(&ANT_SCHEMA, "ant", initial, 0.0, fields).unwrap()
}

proptest! {
    #[test]
    fn prop_playback_invariants(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut fields = Fields::new();
        let mut buffer = seeded(&mut fields);
        // Started by the first tick, so diffs may land before playback begins.
        let mut clock = PlaybackClock::new(PlaybackConfig::default());

        let mut arrival = 0.0f64;
        let mut now = 0.0f64;
        let mut last_displayed = 0.0f64;
        let mut acts_sent = 0usize;

        for op in ops {
            match op {
                Op::Diff { gap, pos, rot, act } => {
                    arrival += f64::from(gap);
                    now = now.max(arrival);
                    acts_sent += usize::from(act);
                    let decoded = diff::decode(&ANT_SCHEMA, "ant", &raw(pos, rot, act)).unwrap();
                    buffer.append(decoded, arrival, &mut fields);
                }
                Op::Tick { dt_ms } => {
                    now += f64::from(dt_ms);
                    clock.start(&buffer);
                    clock.tick(&mut buffer, &mut fields, f64::from(dt_ms) / 1000.0, now);

                    let displayed = clock.displayed_time().unwrap();
                    let newest = buffer.newest().unwrap().timestamp;
                    prop_assert!(displayed >= last_displayed, "went back: {} -> {}", last_displayed, displayed);
                    prop_assert!(displayed >= 0.0 && displayed <= newest);
                    prop_assert!((0.0..=1.0).contains(&clock.fraction()));
                    last_displayed = displayed;
                }
            }

            prop_assert!(!buffer.is_empty());
            // Every snapshot carries every lerp-tracked field.
            for snapshot in buffer.snapshots() {
                for spec in ANT_SCHEMA.lerped() {
                    prop_assert!(snapshot.lerped.contains(spec.name));
                }
            }
            // Timestamps strictly increase.
            let times: Vec<f64> = buffer.snapshots().map(|s| s.timestamp).collect();
            prop_assert!(times.windows(2).all(|w| w[0] < w[1]), "{:?}", times);
        }

        // Every act is applied exactly once after catching up.
        buffer.skip_to_newest(&mut fields);
        let applied = fields.get("acts").and_then(FieldValue::as_lines).map_or(0, <[String]>::len);
        prop_assert_eq!(applied, acts_sent.min(client::field::apply::MAX_LINES));
    }

    #[test]
    fn prop_single_snapshot_ignores_fraction(x in any::<i16>(), y in any::<i16>(), fraction in -2.0f32..3.0) {
        let mut fields = Fields::new();
        let initial = diff::decode(&ANT_SCHEMA, "ant", &raw(Some((x, y)), Some(1.0), false)).unwrap();
        let buffer = SnapshotBuffer::seed(&ANT_SCHEMA, "ant", initial, 0.0, &mut fields).unwrap();
        prop_assert_eq!(
            buffer.value_at("pos", fraction).unwrap(),
            FieldValue::Vec2(Vec2::new(f32::from(x), f32::from(y)))
        );
    }

    #[test]
    fn prop_same_arrival_later_diff_wins(
        first in (any::<i16>(), any::<i16>()),
        second in (any::<i16>(), any::<i16>()),
        at in 1u16..1000,
    ) {
        let mut fields = Fields::new();
        let mut buffer = seeded(&mut fields);
        let at = f64::from(at);
        for pos in [first, second] {
            let decoded = diff::decode(&ANT_SCHEMA, "ant", &raw(Some(pos), None, false)).unwrap();
            buffer.append(decoded, at, &mut fields);
        }
        prop_assert_eq!(buffer.len(), 2);
        prop_assert_eq!(
            buffer.newest().unwrap().lerped.get("pos"),
            Some(&FieldValue::Vec2(Vec2::new(f32::from(second.0), f32::from(second.1))))
        );
    }

    #[test]
    fn prop_angle_blend_takes_short_arc(a in -3.14f32..3.14, b in -3.14f32..3.14, t in 0.0f32..=1.0) {
        let angle = lerp_angle(a, b, t);
        let travelled = normalize_angle(angle - a).abs();
        prop_assert!(travelled <= std::f32::consts::PI + 1e-4);
        prop_assert!(travelled <= normalize_angle(b - a).abs() + 1e-4);
    }
}
