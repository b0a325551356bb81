//! Timelines: sprites, frames and per-frame actions
//!
//! The parser records what each frame does — placements, removals,
//! scripts — in stream order; playback replays a frame's list against the
//! display list and the interpreter.

use std::rc::Rc;

use flicker_avm::Script;

use crate::types::{ColorTransform, Matrix};

/// A display-list placement recorded by a place-object tag.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    /// Stacking depth.
    pub depth: u16,
    /// Character to place; `None` modifies the object already at the
    /// depth.
    pub character_id: Option<u16>,
    /// Whether this updates an existing object instead of placing a new
    /// one.
    pub is_move: bool,
    /// Transform, when given.
    pub matrix: Option<Matrix>,
    /// Color transform, when given.
    pub color_transform: Option<ColorTransform>,
    /// Morph ratio, when given.
    pub ratio: Option<u16>,
    /// Instance name, when given.
    pub name: Option<String>,
    /// Clipping depth, when given.
    pub clip_depth: Option<u16>,
}

/// One recorded action of a frame.
#[derive(Debug, Clone)]
pub enum FrameAction {
    /// Place or update a display-list entry.
    Place(Placement),
    /// Remove the display-list entry at a depth.
    Remove {
        /// The depth to clear.
        depth: u16,
    },
    /// Run a script when the frame is shown.
    Script(Rc<Script>),
    /// Run a sprite's initialization script once, before the frame's
    /// other scripts.
    InitScript {
        /// The sprite the script initializes.
        sprite_id: u16,
        /// The script to run.
        script: Rc<Script>,
    },
}

/// One frame of a timeline.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Frame label, when a frame-label tag named it.
    pub label: Option<String>,
    /// Actions in stream order.
    pub actions: Vec<FrameAction>,
}

/// A timeline: the root movie or a sprite character.
#[derive(Debug, Default)]
pub struct Sprite {
    frame_count: u16,
    frames: Vec<Frame>,
    current: Frame,
}

impl Sprite {
    /// Create a timeline declaring `frame_count` frames.
    pub fn new(frame_count: u16) -> Self {
        Self {
            frame_count,
            frames: Vec::with_capacity(frame_count as usize),
            current: Frame::default(),
        }
    }

    /// Declared number of frames.
    pub fn frame_count(&self) -> u16 {
        self.frame_count
    }

    /// Declare the frame count (the root's is only known after the stream
    /// header).
    pub fn set_frame_count(&mut self, frame_count: u16) {
        self.frame_count = frame_count;
    }

    /// Frames completed by the parser so far.
    pub fn frames_loaded(&self) -> u16 {
        self.frames.len() as u16
    }

    /// A completed frame.
    pub fn frame(&self, index: u16) -> Option<&Frame> {
        self.frames.get(index as usize)
    }

    /// Resolve a frame label to its index.
    pub fn frame_for_label(&self, label: &str) -> Option<u16> {
        self.frames
            .iter()
            .position(|f| f.label.as_deref() == Some(label))
            .map(|i| i as u16)
    }

    /// Record an action on the frame under construction.
    pub fn record(&mut self, action: FrameAction) {
        self.current.actions.push(action);
    }

    /// Label the frame under construction.
    pub fn set_label(&mut self, label: String) {
        self.current.label = Some(label);
    }

    /// Complete the frame under construction (a show-frame tag).
    pub fn show_frame(&mut self) {
        self.frames.push(std::mem::take(&mut self.current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_accumulate_in_order() {
        let mut sprite = Sprite::new(2);
        sprite.record(FrameAction::Remove { depth: 1 });
        sprite.set_label("start".to_owned());
        sprite.show_frame();
        sprite.record(FrameAction::Remove { depth: 2 });
        sprite.show_frame();

        assert_eq!(sprite.frames_loaded(), 2);
        assert_eq!(sprite.frame(0).unwrap().label.as_deref(), Some("start"));
        assert_eq!(sprite.frame(0).unwrap().actions.len(), 1);
        assert_eq!(sprite.frame_for_label("start"), Some(0));
        assert_eq!(sprite.frame_for_label("missing"), None);
        assert!(sprite.frame(2).is_none());
    }
}
