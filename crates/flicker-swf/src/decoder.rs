//! The streaming container decoder
//!
//! A resumable state machine over buffered input:
//!
//! ```text
//! ReadSignature -> ReadStreamHeader -> ReadTags -> Eof
//! ```
//!
//! Each `feed` call consumes as much as possible and reports status. A
//! record that is not fully buffered yet yields [`Status::NeedData`]
//! without consuming anything, so the caller can retry after more bytes
//! arrive — any number of times, with no side effects in between.

use std::rc::Rc;

use flate2::{Decompress, FlushDecompress, Status as FlateStatus};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use flicker_avm::Script;
use flicker_bits::{BitReader, Buffer, BufferId, BufferQueue};

use crate::character::Character;
use crate::error::DecodeError;
use crate::sprite::Sprite;
use crate::tag::{self, FLAG_FIRST_ONLY, FLAG_SPRITE};
use crate::types::{Color, Rect, TWIPS_PER_PIXEL};

/// Output chunk size while inflating compressed streams.
const INFLATE_CHUNK: usize = 32 * 1024;

/// Result of a `feed` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress was made; more input may still be processed.
    Ok,
    /// The next record is not fully buffered; feed more bytes and retry.
    NeedData,
    /// The stream header is decoded: dimensions, rate and frame count are
    /// now known.
    Init,
    /// The end tag was reached; the document is complete.
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Signature,
    StreamHeader,
    Tags,
    Eof,
}

/// The streaming SWF decoder.
pub struct SwfDecoder {
    state: State,
    version: u8,
    declared_length: u32,
    compressed: bool,
    inflate: Option<Decompress>,
    /// Bytes as fed, before decompression.
    raw_queue: BufferQueue,
    /// Decoded container bytes ready for parsing.
    input_queue: BufferQueue,
    tags_parsed: u64,
    frame_rate: f64,
    width: u32,
    height: u32,
    initialized: bool,
    root: Sprite,
    sprite_stack: Vec<Sprite>,
    characters: FxHashMap<u16, Character>,
    /// Scripts keyed by buffer identity, so bytecode shared across tags is
    /// wrapped once.
    scripts: FxHashMap<BufferId, Rc<Script>>,
    /// Exported character names.
    pub(crate) exports: FxHashMap<String, u16>,
    /// Shared JPEG encoding tables, when present.
    pub(crate) jpeg_tables: Option<Buffer>,
    /// Stage background color.
    pub(crate) background: Color,
}

impl Default for SwfDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SwfDecoder {
    /// Create a decoder awaiting the stream signature.
    pub fn new() -> Self {
        Self {
            state: State::Signature,
            version: 0,
            declared_length: 0,
            compressed: false,
            inflate: None,
            raw_queue: BufferQueue::new(),
            input_queue: BufferQueue::new(),
            tags_parsed: 0,
            frame_rate: 0.0,
            width: 0,
            height: 0,
            initialized: false,
            root: Sprite::new(0),
            sprite_stack: Vec::new(),
            characters: FxHashMap::default(),
            scripts: FxHashMap::default(),
            exports: FxHashMap::default(),
            jpeg_tables: None,
            background: Color::default(),
        }
    }

    // ==================== Public surface ====================

    /// Feed a chunk of transport bytes and parse as far as possible.
    ///
    /// Feeding an empty slice retries from the current position, which is
    /// how a caller resumes after [`Status::Init`] or acts on newly
    /// arrived data pushed elsewhere.
    pub fn feed(&mut self, data: &[u8]) -> Result<Status, DecodeError> {
        if !data.is_empty() {
            self.raw_queue.push(Buffer::new(data));
        }
        loop {
            match self.parse_once()? {
                Status::Ok => continue,
                other => return Ok(other),
            }
        }
    }

    /// Signal end of transport. Once parsing has reached the tag loop, no
    /// further input can arrive, so the stream is complete.
    pub fn signal_eof(&mut self) -> Status {
        if self.state == State::Tags {
            self.state = State::Eof;
        }
        match self.state {
            State::Eof => Status::Eof,
            _ => Status::NeedData,
        }
    }

    /// Declared player version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Declared total stream length in bytes.
    pub fn declared_length(&self) -> u32 {
        self.declared_length
    }

    /// Stage size in pixels, once the header is decoded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.initialized.then_some((self.width, self.height))
    }

    /// Frames per second, once the header is decoded.
    pub fn frame_rate(&self) -> Option<f64> {
        self.initialized.then_some(self.frame_rate)
    }

    /// Declared frame count of the root timeline.
    pub fn frame_count(&self) -> u16 {
        self.root.frame_count()
    }

    /// Root-timeline frames fully parsed so far.
    pub fn frames_loaded(&self) -> u16 {
        self.root.frames_loaded()
    }

    /// Stage background color.
    pub fn background_color(&self) -> Color {
        self.background
    }

    /// Look up a decoded character.
    pub fn character(&self, id: u16) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Number of decoded characters.
    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Iterate decoded characters.
    pub fn characters(&self) -> impl Iterator<Item = (u16, &Character)> {
        self.characters.iter().map(|(&id, c)| (id, c))
    }

    /// Look up an exported character id by name.
    pub fn export(&self, name: &str) -> Option<u16> {
        self.exports.get(name).copied()
    }

    /// Iterate exported character names.
    pub fn exports(&self) -> impl Iterator<Item = (&str, u16)> {
        self.exports.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// The root timeline.
    pub fn root_sprite(&self) -> &Sprite {
        &self.root
    }

    // ==================== State machine ====================

    fn parse_once(&mut self) -> Result<Status, DecodeError> {
        match self.state {
            State::Signature => self.parse_signature(),
            State::StreamHeader => {
                self.drain_input()?;
                self.parse_stream_header()
            }
            State::Tags => {
                self.drain_input()?;
                self.parse_tag()
            }
            State::Eof => Ok(Status::Eof),
        }
    }

    /// 8 bytes: 3-byte magic, version, declared total length. The magic's
    /// first byte distinguishes plain from compressed bodies.
    fn parse_signature(&mut self) -> Result<Status, DecodeError> {
        let Some(buffer) = self.raw_queue.pull(8) else {
            return Ok(Status::NeedData);
        };
        let b = buffer.as_slice();
        let magic = [b[0], b[1], b[2]];
        if (magic[0] != b'F' && magic[0] != b'C') || magic[1] != b'W' || magic[2] != b'S' {
            return Err(DecodeError::BadMagic(magic));
        }
        self.version = b[3];
        self.declared_length = u32::from_le_bytes([b[4], b[5], b[6], b[7]]);
        self.compressed = magic[0] == b'C';
        if self.compressed {
            debug!("compressed stream");
            self.inflate = Some(Decompress::new(true));
        } else {
            debug!("plain stream");
        }
        debug!(
            version = self.version,
            length = self.declared_length,
            "signature parsed"
        );
        self.state = State::StreamHeader;
        Ok(Status::Ok)
    }

    /// The stream dimensions record: a packed rectangle plus 16-bit frame
    /// rate (fixed point, /256) and frame count. The byte requirement is
    /// computed from the rectangle's self-described field width before
    /// anything is consumed, so this state never eats partial data.
    fn parse_stream_header(&mut self) -> Result<Status, DecodeError> {
        let Some(first) = self.input_queue.peek(1) else {
            return Ok(Status::NeedData);
        };
        let nbits = (first.as_slice()[0] >> 3) as usize;
        let rect_bytes = (5 + 4 * nbits).div_ceil(8);
        let needed = rect_bytes + 4;
        let Some(buffer) = self.input_queue.peek(needed) else {
            return Ok(Status::NeedData);
        };

        let mut r = BitReader::new(buffer);
        let rect = Rect::parse(&mut r)?;
        r.sync();
        self.frame_rate = r.u16()? as f64 / 256.0;
        let frame_count = r.u16()?;
        let consumed = r.position();
        let _ = self.input_queue.pull(consumed);

        if rect.x_min != 0 || rect.y_min != 0 {
            warn!(
                x_min = rect.x_min,
                y_min = rect.y_min,
                "stage does not start at 0,0"
            );
        }
        self.width = (rect.x_max as f64 / TWIPS_PER_PIXEL).ceil().max(0.0) as u32;
        self.height = (rect.y_max as f64 / TWIPS_PER_PIXEL).ceil().max(0.0) as u32;
        self.root.set_frame_count(frame_count);
        self.initialized = true;
        info!(
            width = self.width,
            height = self.height,
            rate = self.frame_rate,
            frames = frame_count,
            "stream header parsed"
        );

        self.state = State::Tags;
        Ok(Status::Init)
    }

    /// One tag per call: peek the 2-byte header (6 bytes for the
    /// long form), require the whole body, then consume and dispatch.
    fn parse_tag(&mut self) -> Result<Status, DecodeError> {
        let Some(header) = self.input_queue.peek(2) else {
            return Ok(Status::NeedData);
        };
        let h = header.as_slice();
        let x = u16::from_le_bytes([h[0], h[1]]);
        let code = x >> 6;
        let short_len = (x & 0x3f) as usize;
        let (header_len, tag_len) = if short_len == 0x3f {
            let Some(long) = self.input_queue.peek(6) else {
                return Ok(Status::NeedData);
            };
            let l = long.as_slice();
            (6, u32::from_le_bytes([l[2], l[3], l[4], l[5]]) as usize)
        } else {
            (2, short_len)
        };

        debug!(
            offset = self.input_queue.offset(),
            code,
            name = tag::name(code),
            len = tag_len,
            "tag"
        );

        if self.input_queue.depth() < header_len + tag_len {
            return Ok(Status::NeedData);
        }
        let _ = self.input_queue.pull(header_len);
        let body = if tag_len > 0 {
            self.input_queue
                .pull(tag_len)
                .expect("depth checked above")
        } else {
            Buffer::empty()
        };

        self.process_tag(code, body, false);

        if code == 0 {
            self.state = State::Eof;
            return Ok(Status::Eof);
        }
        Ok(Status::Ok)
    }

    /// Dispatch one tag body. All failure modes here cost one tag: an
    /// unknown code, a first-only violation, a decode error and a
    /// boundary mismatch each warn and move on.
    fn process_tag(&mut self, code: u16, body: Buffer, in_sprite: bool) {
        let tag_index = self.tags_parsed;
        self.tags_parsed += 1;

        let Some(entry) = tag::lookup(code) else {
            warn!(code, "tag not implemented, skipped");
            return;
        };
        if entry.flags & FLAG_FIRST_ONLY != 0 && tag_index > 0 {
            warn!(name = entry.name, "tag only valid as first tag, skipped");
            return;
        }
        if in_sprite && entry.flags & FLAG_SPRITE == 0 {
            warn!(name = entry.name, "tag not valid inside a sprite, skipped");
            return;
        }

        let len = body.len();
        let mut r = BitReader::new(body);
        match (entry.func)(self, &mut r) {
            Ok(()) => {
                let left = len.saturating_sub(r.position());
                if left > 0 {
                    warn!(name = entry.name, left, "early finish decoding tag");
                }
            }
            Err(e) => {
                warn!(name = entry.name, error = %e, "tag failed to decode, skipped");
            }
        }
    }

    /// Dispatch a tag found inside a define-sprite body.
    pub(crate) fn process_sprite_tag(&mut self, code: u16, body: Buffer) {
        self.process_tag(code, body, true);
    }

    // ==================== Decompression ====================

    /// Move everything fed so far into the parse queue, inflating if the
    /// stream is compressed.
    fn drain_input(&mut self) -> Result<(), DecodeError> {
        while self.raw_queue.depth() > 0 {
            let buffer = self.raw_queue.pull_all();
            let Some(z) = self.inflate.as_mut() else {
                self.input_queue.push(buffer);
                continue;
            };
            let data = buffer.as_slice();
            let mut pos = 0;
            while pos < data.len() {
                let before_in = z.total_in();
                let mut out = Vec::with_capacity(INFLATE_CHUNK);
                let status = z
                    .decompress_vec(&data[pos..], &mut out, FlushDecompress::Sync)
                    .map_err(|e| DecodeError::Decompression(e.to_string()))?;
                pos += (z.total_in() - before_in) as usize;
                let produced = !out.is_empty();
                if produced {
                    self.input_queue.push(Buffer::from_vec(out));
                }
                match status {
                    FlateStatus::StreamEnd => return Ok(()),
                    FlateStatus::BufError => break,
                    FlateStatus::Ok => {
                        if !produced && (z.total_in() - before_in) == 0 {
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ==================== Decode-function services ====================

    /// The timeline tags currently record into: the innermost sprite
    /// under definition, or the root.
    pub(crate) fn current_sprite_mut(&mut self) -> &mut Sprite {
        if self.sprite_stack.is_empty() {
            &mut self.root
        } else {
            self.sprite_stack.last_mut().expect("non-empty stack")
        }
    }

    /// Begin recording into a nested sprite.
    pub(crate) fn begin_sprite(&mut self, frame_count: u16) {
        self.sprite_stack.push(Sprite::new(frame_count));
    }

    /// Finish the innermost sprite under definition.
    pub(crate) fn end_sprite(&mut self) -> Sprite {
        self.sprite_stack.pop().expect("unbalanced sprite nesting")
    }

    /// Register a character, rejecting duplicate ids.
    pub(crate) fn define_character(
        &mut self,
        id: u16,
        character: Character,
    ) -> Result<(), crate::error::TagError> {
        if self.characters.contains_key(&id) {
            return Err(crate::error::TagError::DuplicateCharacter(id));
        }
        debug!(id, kind = character.kind(), "character defined");
        self.characters.insert(id, character);
        Ok(())
    }

    /// Wrap an action buffer as a script, reusing the existing wrapper
    /// when the same buffer region was seen before.
    pub(crate) fn intern_script(&mut self, buffer: Buffer, name: &str) -> Rc<Script> {
        let key = buffer.id();
        if let Some(script) = self.scripts.get(&key) {
            return Rc::clone(script);
        }
        let script = Rc::new(Script::top_level(buffer, name, self.version));
        self.scripts.insert(key, Rc::clone(&script));
        script
    }

    /// Number of distinct script buffers wrapped so far.
    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }
}
