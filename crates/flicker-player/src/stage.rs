//! The stage: the VM's window onto playback state
//!
//! Implements [`Host`] for the interpreter. Timeline commands issued by
//! scripts (goto, play/stop) are latched here and applied by the player
//! after the frame's scripts finish, which keeps script execution free of
//! re-entrant timeline mutation.

use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::info;

use flicker_avm::Host;

/// Playback state shared between the player and the scripts it runs.
#[derive(Debug)]
pub struct Stage {
    /// Stage width in pixels.
    pub width: u32,
    /// Stage height in pixels.
    pub height: u32,
    /// Declared frame count of the root timeline.
    pub frame_count: u16,
    /// Root frames decoded so far.
    pub frames_loaded: u16,
    /// Current frame index (zero-based).
    pub current_frame: u16,
    /// Whether the timeline auto-advances.
    pub playing: bool,
    /// Frame seek requested by a script, applied after the frame's
    /// scripts run.
    pub pending_goto: Option<u16>,
    /// Pointer position in pixels.
    pub mouse: (f64, f64),
    /// Label → frame index, copied from the root timeline.
    pub labels: FxHashMap<String, u16>,
    /// Collected trace output.
    pub traces: Vec<String>,
    /// URL requests issued by scripts.
    pub url_requests: Vec<(String, String)>,
    start: Instant,
}

impl Stage {
    /// Create a stage of the given size and timeline length.
    pub fn new(width: u32, height: u32, frame_count: u16) -> Self {
        Self {
            width,
            height,
            frame_count,
            frames_loaded: 0,
            current_frame: 0,
            playing: true,
            pending_goto: None,
            mouse: (0.0, 0.0),
            labels: FxHashMap::default(),
            traces: Vec::new(),
            url_requests: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Drain collected trace output.
    pub fn take_traces(&mut self) -> Vec<String> {
        std::mem::take(&mut self.traces)
    }
}

impl Host for Stage {
    fn trace(&mut self, message: &str) {
        info!(target: "flicker::trace", "{message}");
        self.traces.push(message.to_owned());
    }

    fn stage_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn mouse_position(&self) -> (f64, f64) {
        self.mouse
    }

    fn frame_count(&self) -> u16 {
        self.frame_count
    }

    fn frames_loaded(&self) -> u16 {
        self.frames_loaded
    }

    fn current_frame(&self) -> u16 {
        self.current_frame
    }

    fn goto_frame(&mut self, frame: u16) {
        self.pending_goto = Some(frame.min(self.frame_count.saturating_sub(1)));
    }

    fn goto_label(&mut self, label: &str) -> bool {
        match self.labels.get(label) {
            Some(&frame) => {
                self.pending_goto = Some(frame);
                true
            }
            None => false,
        }
    }

    fn advance_frames(&mut self, delta: i32) {
        let target = (self.current_frame as i32 + delta)
            .clamp(0, self.frame_count.saturating_sub(1) as i32);
        self.pending_goto = Some(target as u16);
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    fn get_url(&mut self, url: &str, target: &str) {
        info!(url, target, "script requested a URL");
        self.url_requests.push((url.to_owned(), target.to_owned()));
    }

    fn elapsed_millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
