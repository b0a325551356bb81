//! The display list
//!
//! A depth-ordered map of placed characters. Placement semantics follow
//! the place-object tags: a plain place replaces whatever sits at the
//! depth, a move updates the existing entry in place, and a move with a
//! character id swaps the character while keeping unspecified attributes.

use std::collections::BTreeMap;

use tracing::warn;

use flicker_swf::{ColorTransform, Matrix, Placement};

/// One entry on the display list.
#[derive(Debug, Clone)]
pub struct DisplayObject {
    /// The character rendered at this depth.
    pub character_id: u16,
    /// Placement transform.
    pub matrix: Matrix,
    /// Placement color transform.
    pub color_transform: ColorTransform,
    /// Morph ratio.
    pub ratio: u16,
    /// Instance name, when given.
    pub name: Option<String>,
    /// Depths this entry clips, when it is a clipping layer.
    pub clip_depth: Option<u16>,
}

impl DisplayObject {
    fn new(character_id: u16) -> Self {
        Self {
            character_id,
            matrix: Matrix::IDENTITY,
            color_transform: ColorTransform::IDENTITY,
            ratio: 0,
            name: None,
            clip_depth: None,
        }
    }

    fn apply(&mut self, p: &Placement) {
        if let Some(m) = p.matrix {
            self.matrix = m;
        }
        if let Some(ct) = p.color_transform {
            self.color_transform = ct;
        }
        if let Some(ratio) = p.ratio {
            self.ratio = ratio;
        }
        if let Some(name) = &p.name {
            self.name = Some(name.clone());
        }
        if let Some(clip) = p.clip_depth {
            self.clip_depth = Some(clip);
        }
    }
}

/// Depth-ordered set of placed characters.
#[derive(Debug, Default)]
pub struct DisplayList {
    objects: BTreeMap<u16, DisplayObject>,
}

impl DisplayList {
    /// Create an empty display list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a recorded placement.
    pub fn place(&mut self, p: &Placement) {
        match (p.is_move, p.character_id) {
            (false, Some(id)) => {
                // A plain place replaces whatever occupied the depth.
                let mut object = DisplayObject::new(id);
                object.apply(p);
                if self.objects.insert(p.depth, object).is_some() {
                    warn!(depth = p.depth, "replaced an existing display object");
                }
            }
            (true, Some(id)) => match self.objects.get_mut(&p.depth) {
                Some(object) => {
                    object.character_id = id;
                    object.apply(p);
                }
                None => {
                    let mut object = DisplayObject::new(id);
                    object.apply(p);
                    self.objects.insert(p.depth, object);
                }
            },
            (true, None) => match self.objects.get_mut(&p.depth) {
                Some(object) => object.apply(p),
                None => warn!(depth = p.depth, "move of an empty depth ignored"),
            },
            (false, None) => {
                warn!(depth = p.depth, "placement without a character id ignored");
            }
        }
    }

    /// Clear a depth.
    pub fn remove(&mut self, depth: u16) {
        if self.objects.remove(&depth).is_none() {
            warn!(depth, "removal of an empty depth ignored");
        }
    }

    /// The entry at a depth.
    pub fn get(&self, depth: u16) -> Option<&DisplayObject> {
        self.objects.get(&depth)
    }

    /// Entries in depth order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &DisplayObject)> {
        self.objects.iter().map(|(&d, o)| (d, o))
    }

    /// Number of placed objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_new(depth: u16, id: u16) -> Placement {
        Placement {
            depth,
            character_id: Some(id),
            ..Placement::default()
        }
    }

    #[test]
    fn test_place_and_remove() {
        let mut list = DisplayList::new();
        list.place(&place_new(1, 10));
        list.place(&place_new(3, 30));
        list.place(&place_new(2, 20));
        let depths: Vec<u16> = list.iter().map(|(d, _)| d).collect();
        assert_eq!(depths, [1, 2, 3]);
        list.remove(2);
        assert_eq!(list.len(), 2);
        assert!(list.get(2).is_none());
    }

    #[test]
    fn test_move_updates_in_place() {
        let mut list = DisplayList::new();
        let mut first = place_new(1, 10);
        first.name = Some("hero".to_owned());
        list.place(&first);

        // A move with only a ratio keeps character and name.
        list.place(&Placement {
            depth: 1,
            is_move: true,
            ratio: Some(7),
            ..Placement::default()
        });
        let object = list.get(1).unwrap();
        assert_eq!(object.character_id, 10);
        assert_eq!(object.name.as_deref(), Some("hero"));
        assert_eq!(object.ratio, 7);

        // A move with a character id swaps the character, keeping the rest.
        list.place(&Placement {
            depth: 1,
            is_move: true,
            character_id: Some(11),
            ..Placement::default()
        });
        let object = list.get(1).unwrap();
        assert_eq!(object.character_id, 11);
        assert_eq!(object.ratio, 7);
    }

    #[test]
    fn test_plain_place_replaces() {
        let mut list = DisplayList::new();
        let mut first = place_new(1, 10);
        first.name = Some("old".to_owned());
        list.place(&first);
        list.place(&place_new(1, 11));
        let object = list.get(1).unwrap();
        assert_eq!(object.character_id, 11);
        assert_eq!(object.name, None);
    }
}
