use std::path::{Path, PathBuf};

use crate::device::TextureHandle;

/// Most backing textures a single picture may use.
pub const MAX_BACKING_TEXTURES: usize = 3;

/// Stable reference to a picture in the manager's arena.
///
/// A released slot bumps its generation, so stale ids resolve to nothing
/// instead of aliasing a newer picture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PictureId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadState {
    /// Empty path, inactive manager, or deleted.
    Uninitialized,
    /// GPU textures are resident.
    Loaded,
    /// Lazy picture with known size; textures not resident.
    LazyPending,
    /// Loading failed; draws are skipped.
    Failed,
}

/// Logical picture and its (up to three) backing textures.
#[derive(Debug, Clone)]
pub struct Picture {
    pub(crate) path: PathBuf,
    pub(crate) state: LoadState,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) frame_w: u32,
    pub(crate) frame_h: u32,
    pub(crate) lazy: bool,
    pub(crate) textures: [Option<TextureHandle>; MAX_BACKING_TEXTURES],
    /// Rows stored per backing texture.
    pub(crate) unit_rows: u32,
    pub(crate) error: Option<String>,
}

impl Picture {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: LoadState::Uninitialized,
            width: 0,
            height: 0,
            frame_w: 0,
            frame_h: 0,
            lazy: false,
            textures: [None; MAX_BACKING_TEXTURES],
            unit_rows: 0,
            error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Logical width in pixels; survives lazy unload.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_w, self.frame_h)
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    /// Picture has a known size and may be drawn.
    pub fn is_inited(&self) -> bool {
        matches!(self.state, LoadState::Loaded | LoadState::LazyPending)
    }

    pub fn textures(&self) -> &[Option<TextureHandle>; MAX_BACKING_TEXTURES] {
        &self.textures
    }

    /// Number of resident backing textures.
    pub fn texture_count(&self) -> usize {
        self.textures.iter().flatten().count()
    }

    pub fn unit_rows(&self) -> u32 {
        self.unit_rows
    }

    /// Diagnostic for the last failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.state = LoadState::Failed;
        self.error = Some(message);
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    picture: Option<Picture>,
}

/// Generational arena of pictures.
#[derive(Debug, Default)]
pub(crate) struct PictureArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl PictureArena {
    pub fn insert(&mut self, picture: Picture) -> PictureId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.picture = Some(picture);
            return PictureId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            picture: Some(picture),
        });
        PictureId { index, generation: 0 }
    }

    pub fn get(&self, id: PictureId) -> Option<&Picture> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.picture.as_ref())
    }

    pub fn get_mut(&mut self, id: PictureId) -> Option<&mut Picture> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.picture.as_mut())
    }

    /// Current id for a live slot index.
    pub fn id_at(&self, index: u32) -> Option<PictureId> {
        let slot = self.slots.get(index as usize)?;
        slot.picture.as_ref()?;
        Some(PictureId {
            index,
            generation: slot.generation,
        })
    }

    pub fn remove(&mut self, id: PictureId) -> Option<Picture> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let picture = slot.picture.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(picture)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.picture.is_some()).count()
    }

    pub fn ids(&self) -> impl Iterator<Item = PictureId> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.picture.as_ref().map(|_| PictureId {
                index: i as u32,
                generation: s.generation,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_ids_do_not_alias_reused_slots() {
        let mut arena = PictureArena::default();
        let a = arena.insert(Picture::new("a.png".into()));
        arena.remove(a).unwrap();

        let b = arena.insert(Picture::new("b.png".into()));
        assert_eq!(a.index, b.index);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).unwrap().path(), Path::new("b.png"));
        assert_eq!(arena.len(), 1);
    }
}
