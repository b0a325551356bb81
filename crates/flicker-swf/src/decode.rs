//! Per-tag decode functions
//!
//! Each function consumes one tag body through a reader scoped to exactly
//! the payload. Truncated payloads surface as [`TagError`]s, which the tag
//! loop downgrades to warnings — one bad tag never aborts the stream.
//!
//! Character-bearing tags decode the identifying header fields and keep
//! the remainder as a zero-copy view for the rendering/audio
//! collaborators; full style/glyph/sample decoding is outside this crate.

use tracing::warn;

use flicker_bits::BitReader;

use crate::character::Character;
use crate::decoder::SwfDecoder;
use crate::error::TagError;
use crate::sprite::{FrameAction, Placement};
use crate::types::{Color, ColorTransform, Matrix, Rect};

pub(crate) fn tag_end(_s: &mut SwfDecoder, _r: &mut BitReader) -> Result<(), TagError> {
    Ok(())
}

pub(crate) fn tag_ignore(_s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let _ = r.rest();
    Ok(())
}

pub(crate) fn tag_show_frame(s: &mut SwfDecoder, _r: &mut BitReader) -> Result<(), TagError> {
    s.current_sprite_mut().show_frame();
    Ok(())
}

pub(crate) fn tag_frame_label(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let label = r.string()?;
    s.current_sprite_mut().set_label(label);
    Ok(())
}

pub(crate) fn tag_set_background_color(
    s: &mut SwfDecoder,
    r: &mut BitReader,
) -> Result<(), TagError> {
    s.background = Color::parse_rgb(r)?;
    Ok(())
}

pub(crate) fn tag_do_action(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let script = s.intern_script(r.rest(), "");
    s.current_sprite_mut().record(FrameAction::Script(script));
    Ok(())
}

pub(crate) fn tag_do_init_action(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let sprite_id = r.u16()?;
    let script = s.intern_script(r.rest(), "");
    s.current_sprite_mut()
        .record(FrameAction::InitScript { sprite_id, script });
    Ok(())
}

pub(crate) fn tag_place_object(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let depth = r.u16()?;
    let matrix = Matrix::parse(r)?;
    let color_transform = if r.remaining_bits() >= 8 {
        Some(ColorTransform::parse(r, false)?)
    } else {
        None
    };
    s.current_sprite_mut().record(FrameAction::Place(Placement {
        depth,
        character_id: Some(id),
        is_move: false,
        matrix: Some(matrix),
        color_transform,
        ..Placement::default()
    }));
    Ok(())
}

pub(crate) fn tag_place_object_2(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let has_clip_actions = r.bit()?;
    let has_clip_depth = r.bit()?;
    let has_name = r.bit()?;
    let has_ratio = r.bit()?;
    let has_color_transform = r.bit()?;
    let has_matrix = r.bit()?;
    let has_character = r.bit()?;
    let is_move = r.bit()?;

    let mut placement = Placement {
        depth: r.u16()?,
        is_move,
        ..Placement::default()
    };
    if has_character {
        placement.character_id = Some(r.u16()?);
    }
    if has_matrix {
        placement.matrix = Some(Matrix::parse(r)?);
    }
    if has_color_transform {
        placement.color_transform = Some(ColorTransform::parse(r, true)?);
    }
    if has_ratio {
        placement.ratio = Some(r.u16()?);
    }
    if has_name {
        placement.name = Some(r.string()?);
    }
    if has_clip_depth {
        placement.clip_depth = Some(r.u16()?);
    }
    if has_clip_actions {
        warn!(depth = placement.depth, "clip actions not supported, skipped");
        let _ = r.rest();
    }
    s.current_sprite_mut().record(FrameAction::Place(placement));
    Ok(())
}

pub(crate) fn tag_remove_object(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let _id = r.u16()?;
    let depth = r.u16()?;
    s.current_sprite_mut().record(FrameAction::Remove { depth });
    Ok(())
}

pub(crate) fn tag_remove_object_2(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let depth = r.u16()?;
    s.current_sprite_mut().record(FrameAction::Remove { depth });
    Ok(())
}

pub(crate) fn tag_define_shape(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let bounds = Rect::parse(r)?;
    let data = r.rest();
    s.define_character(id, Character::Shape { bounds, data })
}

pub(crate) fn tag_define_text(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let bounds = Rect::parse(r)?;
    let data = r.rest();
    s.define_character(id, Character::Text { bounds, data })
}

pub(crate) fn tag_define_edit_text(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let bounds = Rect::parse(r)?;
    let data = r.rest();
    s.define_character(id, Character::EditText { bounds, data })
}

pub(crate) fn tag_define_button(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let data = r.rest();
    s.define_character(id, Character::Button { data })
}

pub(crate) fn tag_define_sound(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let coding = r.u8()?;
    let format = coding >> 4;
    let sample_count = r.u32()?;
    let data = r.rest();
    s.define_character(
        id,
        Character::Sound {
            format,
            sample_count,
            data,
        },
    )
}

pub(crate) fn tag_define_bits_jpeg(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let data = r.rest();
    s.define_character(id, Character::Image { data })
}

pub(crate) fn tag_define_bits_lossless(
    s: &mut SwfDecoder,
    r: &mut BitReader,
) -> Result<(), TagError> {
    let id = r.u16()?;
    let data = r.rest();
    s.define_character(id, Character::Image { data })
}

pub(crate) fn tag_define_font(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let data = r.rest();
    s.define_character(id, Character::Font { data })
}

pub(crate) fn tag_jpeg_tables(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    s.jpeg_tables = Some(r.rest());
    Ok(())
}

pub(crate) fn tag_export_assets(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let count = r.u16()?;
    for _ in 0..count {
        let id = r.u16()?;
        let name = r.string()?;
        s.exports.insert(name, id);
    }
    Ok(())
}

pub(crate) fn tag_file_attributes(_s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let _flags = r.u32()?;
    Ok(())
}

/// A sprite is a tag stream nested inside a tag: read its sub-tags from
/// the payload with the same header rules, restricted to the sprite tag
/// set.
pub(crate) fn tag_define_sprite(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    let id = r.u16()?;
    let frame_count = r.u16()?;
    s.begin_sprite(frame_count);
    let result = parse_sprite_tags(s, r);
    let sprite = s.end_sprite();
    result?;
    s.define_character(id, Character::Sprite(sprite))
}

fn parse_sprite_tags(s: &mut SwfDecoder, r: &mut BitReader) -> Result<(), TagError> {
    loop {
        let x = r.u16()?;
        let code = x >> 6;
        let mut len = (x & 0x3f) as usize;
        if len == 0x3f {
            len = r.u32()? as usize;
        }
        let body = r.take_bytes(len)?;
        if code == 0 {
            return Ok(());
        }
        s.process_sprite_tag(code, body);
    }
}
