//! Tag codes and the dispatch table
//!
//! A tag is dispatched by numeric code through a static table of
//! (code, name, decode function, flags) entries — the lookup has no state
//! of its own. Codes missing from the table are merely unknown: the tag
//! loop warns and skips them, keeping forward compatibility with newer
//! producers.

use flicker_bits::BitReader;

use crate::decode;
use crate::decoder::SwfDecoder;
use crate::error::TagError;

/// Known tag codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum TagCode {
    /// End of a tag stream.
    End = 0,
    /// Complete the frame under construction.
    ShowFrame = 1,
    /// Define a vector shape.
    DefineShape = 2,
    /// Place a character on the display list (legacy form).
    PlaceObject = 4,
    /// Remove a character by id and depth.
    RemoveObject = 5,
    /// Define a JPEG image using the shared tables.
    DefineBitsJpeg = 6,
    /// Define a button (legacy form).
    DefineButton = 7,
    /// Shared JPEG encoding tables.
    JpegTables = 8,
    /// Set the stage background color.
    SetBackgroundColor = 9,
    /// Define a font (legacy form).
    DefineFont = 10,
    /// Define a static text block.
    DefineText = 11,
    /// Attach a script to the frame under construction.
    DoAction = 12,
    /// Define an event sound.
    DefineSound = 14,
    /// Define a zlib-packed bitmap.
    DefineBitsLossless = 20,
    /// Define a self-contained JPEG image.
    DefineBitsJpeg2 = 21,
    /// Define a vector shape (revision 2).
    DefineShape2 = 22,
    /// Advisory protection marker; ignored.
    Protect = 24,
    /// Place, move or update a character on the display list.
    PlaceObject2 = 26,
    /// Remove the character at a depth.
    RemoveObject2 = 28,
    /// Define a vector shape with alpha (revision 3).
    DefineShape3 = 32,
    /// Define a static text block with alpha.
    DefineText2 = 33,
    /// Define a button (revision 2).
    DefineButton2 = 34,
    /// Define a JPEG image with an alpha plane.
    DefineBitsJpeg3 = 35,
    /// Define a zlib-packed bitmap with alpha.
    DefineBitsLossless2 = 36,
    /// Define an editable text field.
    DefineEditText = 37,
    /// Define a nested timeline.
    DefineSprite = 39,
    /// Label the frame under construction.
    FrameLabel = 43,
    /// Define a font (revision 2).
    DefineFont2 = 48,
    /// Export characters by name.
    ExportAssets = 56,
    /// Attach a once-only initialization script to a sprite.
    DoInitAction = 59,
    /// Stream attribute flags; only valid as the first tag.
    FileAttributes = 69,
    /// XMP metadata; ignored.
    Metadata = 77,
}

impl TagCode {
    /// The wire code.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Decode function signature: the tag body arrives as a reader scoped to
/// exactly the payload.
pub type TagFunc = fn(&mut SwfDecoder, &mut BitReader) -> Result<(), TagError>;

/// Only legal as the very first tag of the stream.
pub const FLAG_FIRST_ONLY: u8 = 1 << 0;
/// Also legal inside a define-sprite body.
pub const FLAG_SPRITE: u8 = 1 << 1;

/// One row of the dispatch table.
pub struct TagEntry {
    /// Wire code.
    pub code: u16,
    /// Human-readable name for diagnostics.
    pub name: &'static str,
    /// Decode function.
    pub func: TagFunc,
    /// `FLAG_*` bits.
    pub flags: u8,
}

const fn entry(code: TagCode, name: &'static str, func: TagFunc, flags: u8) -> TagEntry {
    TagEntry {
        code: code as u16,
        name,
        func,
        flags,
    }
}

/// The dispatch table, sorted by code.
static TAG_TABLE: &[TagEntry] = &[
    entry(TagCode::End, "End", decode::tag_end, FLAG_SPRITE),
    entry(TagCode::ShowFrame, "ShowFrame", decode::tag_show_frame, FLAG_SPRITE),
    entry(TagCode::DefineShape, "DefineShape", decode::tag_define_shape, 0),
    entry(TagCode::PlaceObject, "PlaceObject", decode::tag_place_object, FLAG_SPRITE),
    entry(TagCode::RemoveObject, "RemoveObject", decode::tag_remove_object, FLAG_SPRITE),
    entry(TagCode::DefineBitsJpeg, "DefineBitsJPEG", decode::tag_define_bits_jpeg, 0),
    entry(TagCode::DefineButton, "DefineButton", decode::tag_define_button, 0),
    entry(TagCode::JpegTables, "JPEGTables", decode::tag_jpeg_tables, 0),
    entry(
        TagCode::SetBackgroundColor,
        "SetBackgroundColor",
        decode::tag_set_background_color,
        FLAG_SPRITE,
    ),
    entry(TagCode::DefineFont, "DefineFont", decode::tag_define_font, 0),
    entry(TagCode::DefineText, "DefineText", decode::tag_define_text, 0),
    entry(TagCode::DoAction, "DoAction", decode::tag_do_action, FLAG_SPRITE),
    entry(TagCode::DefineSound, "DefineSound", decode::tag_define_sound, 0),
    entry(
        TagCode::DefineBitsLossless,
        "DefineBitsLossless",
        decode::tag_define_bits_lossless,
        0,
    ),
    entry(TagCode::DefineBitsJpeg2, "DefineBitsJPEG2", decode::tag_define_bits_jpeg, 0),
    entry(TagCode::DefineShape2, "DefineShape2", decode::tag_define_shape, 0),
    entry(TagCode::Protect, "Protect", decode::tag_ignore, 0),
    entry(TagCode::PlaceObject2, "PlaceObject2", decode::tag_place_object_2, FLAG_SPRITE),
    entry(TagCode::RemoveObject2, "RemoveObject2", decode::tag_remove_object_2, FLAG_SPRITE),
    entry(TagCode::DefineShape3, "DefineShape3", decode::tag_define_shape, 0),
    entry(TagCode::DefineText2, "DefineText2", decode::tag_define_text, 0),
    entry(TagCode::DefineButton2, "DefineButton2", decode::tag_define_button, 0),
    entry(TagCode::DefineBitsJpeg3, "DefineBitsJPEG3", decode::tag_define_bits_jpeg, 0),
    entry(
        TagCode::DefineBitsLossless2,
        "DefineBitsLossless2",
        decode::tag_define_bits_lossless,
        0,
    ),
    entry(TagCode::DefineEditText, "DefineEditText", decode::tag_define_edit_text, 0),
    entry(TagCode::DefineSprite, "DefineSprite", decode::tag_define_sprite, 0),
    entry(TagCode::FrameLabel, "FrameLabel", decode::tag_frame_label, FLAG_SPRITE),
    entry(TagCode::DefineFont2, "DefineFont2", decode::tag_define_font, 0),
    entry(TagCode::ExportAssets, "ExportAssets", decode::tag_export_assets, 0),
    entry(TagCode::DoInitAction, "DoInitAction", decode::tag_do_init_action, FLAG_SPRITE),
    entry(
        TagCode::FileAttributes,
        "FileAttributes",
        decode::tag_file_attributes,
        FLAG_FIRST_ONLY,
    ),
    entry(TagCode::Metadata, "Metadata", decode::tag_ignore, 0),
];

/// Look up the dispatch entry for a tag code.
pub fn lookup(code: u16) -> Option<&'static TagEntry> {
    TAG_TABLE
        .binary_search_by_key(&code, |e| e.code)
        .ok()
        .map(|i| &TAG_TABLE[i])
}

/// Diagnostic name for a tag code.
pub fn name(code: u16) -> &'static str {
    lookup(code).map_or("unknown", |e| e.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_by_code() {
        for pair in TAG_TABLE.windows(2) {
            assert!(pair[0].code < pair[1].code, "table must stay sorted");
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(1).unwrap().name, "ShowFrame");
        assert_eq!(lookup(26).unwrap().name, "PlaceObject2");
        assert!(lookup(500).is_none());
        assert_eq!(name(12), "DoAction");
        assert_eq!(name(500), "unknown");
    }

    #[test]
    fn test_flags() {
        assert_ne!(lookup(69).unwrap().flags & FLAG_FIRST_ONLY, 0);
        assert_ne!(lookup(12).unwrap().flags & FLAG_SPRITE, 0);
        assert_eq!(lookup(39).unwrap().flags & FLAG_SPRITE, 0);
    }
}
