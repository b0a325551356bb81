//! Frame advancement
//!
//! The player owns the decoder output, the execution context and the
//! display list, and replays one frame's recorded actions per
//! [`Player::advance_frame`] call: placements and removals mutate the
//! display list, scripts run through the interpreter. A script failure is
//! logged and costs only that script; the timeline keeps running.

use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::error;

use flicker_avm::{ExecutionContext, Interpreter, Value};
use flicker_swf::{FrameAction, SwfDecoder};

use crate::display::DisplayList;
use crate::stage::Stage;

/// Errors constructing a player.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The decoder has not parsed the stream header yet.
    #[error("stream header not decoded yet")]
    NotReady,
}

/// Headless playback over a decoded document.
pub struct Player {
    decoder: SwfDecoder,
    cx: ExecutionContext,
    stage: Stage,
    display: DisplayList,
    init_done: FxHashSet<u16>,
}

impl Player {
    /// Create a player over a decoder whose header is parsed. The decoder
    /// may still be mid-stream; playback sees whatever frames exist.
    pub fn new(decoder: SwfDecoder) -> Result<Self, PlayerError> {
        let (width, height) = decoder.dimensions().ok_or(PlayerError::NotReady)?;
        let mut stage = Stage::new(width, height, decoder.frame_count());
        stage.frames_loaded = decoder.frames_loaded();

        let mut cx = ExecutionContext::new(decoder.version());
        let root_object = cx.alloc_object();
        cx.set_root(Value::Object(root_object));
        cx.set_global_property("_root", Value::Object(root_object));

        let mut player = Self {
            decoder,
            cx,
            stage,
            display: DisplayList::new(),
            init_done: FxHashSet::default(),
        };
        player.sync_labels();
        Ok(player)
    }

    /// The decoder the player reads from.
    pub fn decoder(&self) -> &SwfDecoder {
        &self.decoder
    }

    /// The current display list.
    pub fn display(&self) -> &DisplayList {
        &self.display
    }

    /// Playback state.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Drain trace output collected so far.
    pub fn take_traces(&mut self) -> Vec<String> {
        self.stage.take_traces()
    }

    /// Current frame index.
    pub fn current_frame(&self) -> u16 {
        self.stage.current_frame
    }

    /// Whether the timeline auto-advances.
    pub fn playing(&self) -> bool {
        self.stage.playing
    }

    /// Inject a pointer position (pixels).
    pub fn set_mouse(&mut self, x: f64, y: f64) {
        self.stage.mouse = (x, y);
    }

    /// Replay the current frame's actions, then apply navigation: a
    /// pending script goto wins, otherwise a playing timeline advances by
    /// one, wrapping at the end.
    pub fn advance_frame(&mut self) {
        self.stage.frames_loaded = self.decoder.frames_loaded();
        self.sync_labels();

        let index = self.stage.current_frame;
        let actions = match self.decoder.root_sprite().frame(index) {
            Some(frame) => frame.actions.clone(),
            None => Vec::new(),
        };
        for action in actions {
            match action {
                FrameAction::Place(p) => self.display.place(&p),
                FrameAction::Remove { depth } => self.display.remove(depth),
                FrameAction::InitScript { sprite_id, script } => {
                    if self.init_done.insert(sprite_id) {
                        self.run_script(script);
                    }
                }
                FrameAction::Script(script) => self.run_script(script),
            }
        }

        if let Some(target) = self.stage.pending_goto.take() {
            self.stage.current_frame = target;
        } else if self.stage.playing {
            let count = self.stage.frame_count.max(1);
            self.stage.current_frame = (self.stage.current_frame + 1) % count;
        }
    }

    /// Advance `n` frames.
    pub fn run_frames(&mut self, n: u32) {
        for _ in 0..n {
            self.advance_frame();
        }
    }

    fn run_script(&mut self, script: std::rc::Rc<flicker_avm::Script>) {
        let result = Interpreter::new(&mut self.cx, &mut self.stage).execute(script);
        if let Err(e) = result {
            // Script failures never propagate: the rest of the timeline
            // and sibling scripts keep running.
            error!(error = %e, "frame script aborted");
        }
    }

    fn sync_labels(&mut self) {
        let root = self.decoder.root_sprite();
        for index in 0..root.frames_loaded() {
            if let Some(frame) = root.frame(index)
                && let Some(label) = &frame.label
                && !self.stage.labels.contains_key(label)
            {
                self.stage.labels.insert(label.clone(), index);
            }
        }
    }
}
