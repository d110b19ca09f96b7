// 2D drawing surface consumed by entity draw routines
//
// Mirrors the subset of a canvas 2D context the entity kinds use. Transforms
// stack: `save` pushes, `restore` pops.
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

pub trait Canvas {
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, offset: Vec2);
    fn rotate(&mut self, angle: f32);
    fn set_alpha(&mut self, alpha: f32);
    fn stroke_rect(&mut self, min: Vec2, size: Vec2);
    fn fill_rect(&mut self, min: Vec2, size: Vec2);
    fn fill_text(&mut self, text: &str, at: Vec2, size_px: f32, align: TextAlign);
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    Translate(Vec2),
    Rotate(f32),
    Alpha(f32),
    StrokeRect { min: Vec2, size: Vec2 },
    FillRect { min: Vec2, size: Vec2 },
    Text { text: String, at: Vec2, size_px: f32, align: TextAlign },
}

/// Canvas that only records what it was asked to draw.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub commands: Vec<DrawCommand>,
    depth: usize,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current save/restore nesting.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.depth = 0;
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn translations(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Translate(v) => Some(*v),
            _ => None,
        })
    }
}

impl Canvas for RecordingCanvas {
    fn save(&mut self) {
        self.depth += 1;
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, offset: Vec2) {
        self.commands.push(DrawCommand::Translate(offset));
    }

    fn rotate(&mut self, angle: f32) {
        self.commands.push(DrawCommand::Rotate(angle));
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::Alpha(alpha));
    }

    fn stroke_rect(&mut self, min: Vec2, size: Vec2) {
        self.commands.push(DrawCommand::StrokeRect { min, size });
    }

    fn fill_rect(&mut self, min: Vec2, size: Vec2) {
        self.commands.push(DrawCommand::FillRect { min, size });
    }

    fn fill_text(&mut self, text: &str, at: Vec2, size_px: f32, align: TextAlign) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            at,
            size_px,
            align,
        });
    }
}
