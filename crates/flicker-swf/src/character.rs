//! Decoded characters
//!
//! The format's dictionary maps numeric ids to reusable definitions. The
//! set of kinds is closed, so an enum carries the dispatch; each variant
//! keeps its identifying header fields plus the undecoded remainder of the
//! payload as a zero-copy view for the rendering/audio collaborators.

use flicker_bits::Buffer;

use crate::sprite::Sprite;
use crate::types::Rect;

/// A dictionary entry.
#[derive(Debug)]
pub enum Character {
    /// A vector shape definition.
    Shape {
        /// Bounding box in twips.
        bounds: Rect,
        /// Undecoded style and edge records.
        data: Buffer,
    },
    /// A nested timeline.
    Sprite(Sprite),
    /// A button definition.
    Button {
        /// Undecoded button records.
        data: Buffer,
    },
    /// A static text definition.
    Text {
        /// Bounding box in twips.
        bounds: Rect,
        /// Undecoded glyph records.
        data: Buffer,
    },
    /// An editable text field definition.
    EditText {
        /// Bounding box in twips.
        bounds: Rect,
        /// Undecoded field attributes.
        data: Buffer,
    },
    /// An event sound definition.
    Sound {
        /// Coding format tag (0 raw, 1 ADPCM, 2 MP3, 3 raw LE).
        format: u8,
        /// Number of samples.
        sample_count: u32,
        /// Undecoded coded sample data.
        data: Buffer,
    },
    /// A bitmap definition.
    Image {
        /// Undecoded image data (JPEG or zlib-packed bitmap).
        data: Buffer,
    },
    /// A font definition.
    Font {
        /// Undecoded glyph shape table.
        data: Buffer,
    },
}

impl Character {
    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Shape { .. } => "shape",
            Self::Sprite(_) => "sprite",
            Self::Button { .. } => "button",
            Self::Text { .. } => "text",
            Self::EditText { .. } => "edit-text",
            Self::Sound { .. } => "sound",
            Self::Image { .. } => "image",
            Self::Font { .. } => "font",
        }
    }
}
