// Ants: the players. Remote ants interpolate, the local one does not.
use glam::Vec2;

use crate::canvas::{Canvas, TextAlign};
use crate::entity::{Behavior, EntityState};
use crate::field::{FieldSpec, Schema, apply, blend, decode};
use crate::registry::{EntityKind, SelectContext};

static ANT_FIELDS: [FieldSpec; 5] = [
    FieldSpec::lerped("pos", decode::vec2, blend::vec2),
    FieldSpec::lerped("rot", decode::float, blend::angle),
    FieldSpec::immediate("face", Some(decode::text)),
    FieldSpec::merged("inventory", decode::counts, apply::merge_counts),
    FieldSpec::merged("acts", decode::lines, apply::append_lines),
];

pub static ANT_SCHEMA: Schema = Schema::new(&ANT_FIELDS);

pub static REMOTE_ANT: EntityKind = EntityKind {
    type_id: "ant",
    schema: &ANT_SCHEMA,
    interpolate: true,
    behavior: new_behavior,
    select: Some(select_ant),
};

/// The ant this client controls. Its fields are written as they arrive.
pub static LOCAL_ANT: EntityKind = EntityKind {
    type_id: "ant",
    schema: &ANT_SCHEMA,
    interpolate: false,
    behavior: new_behavior,
    select: None,
};

fn select_ant(ctx: &SelectContext<'_>) -> &'static EntityKind {
    if ctx.local_id == Some(ctx.id) {
        &LOCAL_ANT
    } else {
        &REMOTE_ANT
    }
}

fn new_behavior() -> Box<dyn Behavior> {
    Box::new(AntBehavior::default())
}

// Body segment bend angles, head to tail
const SEGMENTS: [f32; 3] = [0.3, 0.4, -0.2];
const SEGMENT_HALF_LEN: f32 = 25.0;
const FACE_PX: f32 = 20.0;
const ACT_PX: f32 = 12.0;
// Full fade takes a quarter second
const FADE_PER_SEC: f32 = 4.0;

#[derive(Debug)]
pub struct AntBehavior {
    alpha: f32,
    fading: bool,
}

impl Default for AntBehavior {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fading: false,
        }
    }
}

impl AntBehavior {
    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl Behavior for AntBehavior {
    fn on_tick(&mut self, _state: &EntityState, dt: f64) {
        if self.fading {
            self.alpha = (self.alpha - dt as f32 * FADE_PER_SEC).max(0.0);
        }
    }

    fn on_draw(&self, state: &EntityState, canvas: &mut dyn Canvas) {
        let pos = state.vec2("pos").unwrap_or_default();
        let rot = state.float("rot").unwrap_or_default();

        canvas.save();
        if self.alpha < 1.0 {
            canvas.set_alpha(self.alpha);
        }
        canvas.translate(pos);
        canvas.rotate(rot);

        // Walk down the body, one nested transform per segment
        for bend in SEGMENTS {
            canvas.save();
            canvas.translate(Vec2::new(0.0, -SEGMENT_HALF_LEN));
            canvas.rotate(bend);
            canvas.translate(Vec2::new(0.0, -SEGMENT_HALF_LEN));
        }

        // Butt
        canvas.stroke_rect(Vec2::new(-40.0, 18.0 - 80.0), Vec2::new(80.0, 80.0));

        for _ in 1..SEGMENTS.len() {
            canvas.restore();
            canvas.stroke_rect(Vec2::splat(-18.0), Vec2::splat(36.0));
        }
        canvas.restore();

        // Head
        canvas.stroke_rect(Vec2::new(-40.0, -18.0), Vec2::new(80.0, 36.0));
        if let Some(face) = state.text("face") {
            canvas.fill_text(face, Vec2::ZERO, FACE_PX, TextAlign::Center);
        }
        if let Some(act) = state
            .fields()
            .get("acts")
            .and_then(|v| v.as_lines())
            .and_then(|lines| lines.last())
        {
            canvas.fill_text(act, Vec2::new(0.0, 36.0), ACT_PX, TextAlign::Center);
        }

        canvas.restore();
    }

    fn on_die(&mut self, _state: &EntityState) -> bool {
        // Veto once to fade out
        if self.fading {
            return false;
        }
        self.fading = true;
        true
    }

    fn teardown_finished(&self, _state: &EntityState) -> bool {
        self.alpha <= 0.0
    }
}
