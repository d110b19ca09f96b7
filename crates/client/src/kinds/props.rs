// Static world props. None of these interpolate; diffs are applied as they
// arrive.
use glam::Vec2;

use crate::canvas::{Canvas, TextAlign};
use crate::entity::{Behavior, EntityState};
use crate::field::{FieldSpec, Schema, decode};
use crate::registry::EntityKind;

static PROP_FIELDS: [FieldSpec; 3] = [
    FieldSpec::immediate("pos", Some(decode::vec2)),
    FieldSpec::immediate("rot", Some(decode::float)),
    FieldSpec::immediate("text", Some(decode::text)),
];

/// Shared by boxes, plants and words.
pub static PROP_SCHEMA: Schema = Schema::new(&PROP_FIELDS);

static TERRBLOCK_FIELDS: [FieldSpec; 3] = [
    FieldSpec::immediate("pos", Some(decode::vec2)),
    FieldSpec::immediate("scale", Some(decode::vec2)),
    FieldSpec::immediate("rot", Some(decode::float)),
];

pub static TERRBLOCK_SCHEMA: Schema = Schema::new(&TERRBLOCK_FIELDS);

pub static BOX: EntityKind = EntityKind {
    type_id: "box",
    schema: &PROP_SCHEMA,
    interpolate: false,
    behavior: boxed,
    select: None,
};

pub static PLANT: EntityKind = EntityKind {
    type_id: "plant",
    schema: &PROP_SCHEMA,
    interpolate: false,
    behavior: plant,
    select: None,
};

pub static WORD: EntityKind = EntityKind {
    type_id: "word",
    schema: &PROP_SCHEMA,
    interpolate: false,
    behavior: word,
    select: None,
};

pub static TERRBLOCK: EntityKind = EntityKind {
    type_id: "terrblock",
    schema: &TERRBLOCK_SCHEMA,
    interpolate: false,
    behavior: terrblock,
    select: None,
};

fn boxed() -> Box<dyn Behavior> {
    Box::new(Framed { half: 50.0, text_px: 10.0 })
}

fn plant() -> Box<dyn Behavior> {
    Box::new(Framed { half: 15.0, text_px: 18.0 })
}

fn word() -> Box<dyn Behavior> {
    Box::new(Word)
}

fn terrblock() -> Box<dyn Behavior> {
    Box::new(TerrBlock)
}

/// Moves the canvas into the entity's frame for the duration of `draw`.
fn in_frame(state: &EntityState, canvas: &mut dyn Canvas, draw: impl FnOnce(&mut dyn Canvas)) {
    canvas.save();
    canvas.translate(state.vec2("pos").unwrap_or_default());
    canvas.rotate(state.float("rot").unwrap_or_default());
    draw(canvas);
    canvas.restore();
}

/// A square outline with a centered label.
#[derive(Debug)]
struct Framed {
    half: f32,
    text_px: f32,
}

impl Behavior for Framed {
    fn on_draw(&self, state: &EntityState, canvas: &mut dyn Canvas) {
        in_frame(state, canvas, |canvas| {
            canvas.stroke_rect(Vec2::splat(-self.half), Vec2::splat(self.half * 2.0));
            if let Some(text) = state.text("text") {
                canvas.fill_text(text, Vec2::ZERO, self.text_px, TextAlign::Center);
            }
        });
    }
}

const WORD_PX: f32 = 18.0;
const WORD_CHAR_WIDTH: f32 = 10.0;
const WORD_HEIGHT: f32 = 20.0;

#[derive(Debug)]
struct Word;

impl Behavior for Word {
    fn on_draw(&self, state: &EntityState, canvas: &mut dyn Canvas) {
        let Some(text) = state.text("text") else {
            return;
        };
        let width = text.chars().count() as f32 * WORD_CHAR_WIDTH;
        in_frame(state, canvas, |canvas| {
            let top_left = Vec2::new(-width / 2.0, -WORD_HEIGHT / 2.0);
            canvas.fill_text(text, top_left, WORD_PX, TextAlign::Left);
        });
    }
}

#[derive(Debug)]
struct TerrBlock;

impl Behavior for TerrBlock {
    fn on_draw(&self, state: &EntityState, canvas: &mut dyn Canvas) {
        let scale = state.vec2("scale").unwrap_or_default();
        in_frame(state, canvas, |canvas| {
            canvas.fill_rect(scale * -0.5, scale);
        });
    }
}
