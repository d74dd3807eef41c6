use std::io::BufRead;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::device::{BackendError, ImageData, RenderBackend, TextureFilter, TextureHandle};

use super::chain::LoadedChain;
use super::picture::{LoadState, MAX_BACKING_TEXTURES, Picture, PictureArena, PictureId};
use super::source::{ImageSource, SourceError};

/// Largest edge accepted from size sidecars and load lists.
pub const MAX_LISTED_DIMENSION: u32 = 8192;

/// Path lines this long are assumed to have been cut off by the list writer.
const MAX_LIST_PATH_LEN: usize = 255;

const SIZE_SIDECAR_SUFFIX: &str = ".size";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureSettings {
    /// Rows per backing texture (further capped by the backend).
    pub max_texture_rows: u32,
    /// Eviction target for free video memory.
    pub low_water_bytes: u64,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            max_texture_rows: 1024,
            low_water_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Owns every logical picture and its GPU textures.
///
/// Pictures are either eager (`load`) or lazy (`lazy_load_picture`); lazy ones
/// know their size up front and upload on first use. Resident pictures are
/// kept in a load-ordered chain that eviction walks when video memory runs
/// low.
pub struct TextureManager {
    source: Box<dyn ImageSource>,
    pictures: PictureArena,
    chain: LoadedChain,
    settings: TextureSettings,
    active: bool,
}

impl TextureManager {
    pub fn new(source: Box<dyn ImageSource>, settings: TextureSettings) -> Self {
        Self {
            source,
            pictures: PictureArena::default(),
            chain: LoadedChain::default(),
            settings,
            active: true,
        }
    }

    pub fn settings(&self) -> TextureSettings {
        self.settings
    }

    /// When inactive, load requests register empty pictures without touching
    /// the source.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn get(&self, id: PictureId) -> Option<&Picture> {
        self.pictures.get(id)
    }

    pub fn picture_count(&self) -> usize {
        self.pictures.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.chain.len()
    }

    /// Resident pictures in eviction order.
    pub fn loaded(&self) -> Vec<PictureId> {
        self.chain
            .iter()
            .filter_map(|i| self.pictures.id_at(i))
            .collect()
    }

    fn unit_rows(&self, backend: &dyn RenderBackend) -> u32 {
        self.settings
            .max_texture_rows
            .min(backend.limits().max_texture_rows)
            .max(1)
    }

    // ── registration ──────────────────────────────────────────────────────

    /// Loads a picture immediately.
    ///
    /// Mask paths are accepted for compatibility with legacy asset lists and
    /// ignored; pictures carry their own alpha.
    pub fn load(
        &mut self,
        backend: &mut dyn RenderBackend,
        path: impl AsRef<Path>,
        mask: Option<&Path>,
        mask_fallback: Option<&Path>,
    ) -> PictureId {
        let path = path.as_ref();
        let _ = (mask, mask_fallback);
        let id = self.pictures.insert(Picture::new(path.to_path_buf()));

        if !self.active || path.as_os_str().is_empty() {
            return id;
        }

        let image = match self.source.decode(path) {
            Ok(image) => image,
            Err(e) => {
                warn!("failed to load picture {}: {e}", path.display());
                self.set_failed(id, e.to_string());
                return id;
            }
        };

        if let Some(p) = self.pictures.get_mut(id) {
            p.width = image.width;
            p.height = image.height;
            p.frame_w = image.width;
            p.frame_h = image.height;
        }

        match self.upload_split(backend, id, &image) {
            Ok(textures) => self.mark_loaded(backend, id, textures),
            Err(e) => {
                warn!(
                    "failed to upload picture {} ({} bytes free): {e}",
                    path.display(),
                    backend.free_memory()
                );
                self.set_failed(id, e.to_string());
            }
        }
        id
    }

    /// Registers a lazily loaded picture; nothing is uploaded yet.
    ///
    /// The size comes from a `<path>.size` sidecar holding width and height on
    /// separate lines, falling back to the image header.
    pub fn lazy_load_picture(
        &mut self,
        path: impl AsRef<Path>,
        mask: Option<&Path>,
        mask_fallback: Option<&Path>,
    ) -> PictureId {
        let path = path.as_ref();
        let _ = (mask, mask_fallback);
        let id = self.pictures.insert(Picture::new(path.to_path_buf()));

        if !self.active || path.as_os_str().is_empty() {
            return id;
        }

        let size = match self.read_size_sidecar(path) {
            Some(size) => Ok(size),
            None => self.source.probe(path),
        };

        match size {
            Ok((w, h)) => self.set_lazy_pending(id, w, h),
            Err(e) => {
                warn!("failed to load picture {}: {e}", path.display());
                self.set_failed(id, e.to_string());
            }
        }
        id
    }

    /// Reads one load-list entry: a path line, then width and height lines.
    ///
    /// Paths are resolved against `dir`. Malformed entries are logged and the
    /// returned picture is `Failed`; an exhausted list yields `Uninitialized`.
    pub fn lazy_load_picture_from_list(
        &mut self,
        reader: &mut dyn BufRead,
        dir: impl AsRef<Path>,
    ) -> PictureId {
        let Some(raw_path) = read_list_line(reader) else {
            return self.pictures.insert(Picture::new(PathBuf::new()));
        };
        let width = read_list_line(reader);
        let height = read_list_line(reader);

        let path = dir.as_ref().join(&raw_path);
        let id = self.pictures.insert(Picture::new(path.clone()));

        if raw_path.len() >= MAX_LIST_PATH_LEN {
            warn!("load list path truncated: {raw_path}");
            self.set_failed(id, "path truncated in load list".to_string());
            return id;
        }
        if raw_path.is_empty() || !self.active {
            return id;
        }

        match (parse_dimension(width.as_deref()), parse_dimension(height.as_deref())) {
            (Some(w), Some(h)) => self.set_lazy_pending(id, w, h),
            _ => {
                warn!(
                    "load list entry {} has invalid size {:?}x{:?}",
                    path.display(),
                    width,
                    height
                );
                self.set_failed(id, "invalid size in load list".to_string());
            }
        }
        id
    }

    fn read_size_sidecar(&self, path: &Path) -> Option<(u32, u32)> {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(SIZE_SIDECAR_SUFFIX);
        let sidecar = PathBuf::from(sidecar);

        let text = match self.source.read_text(&sidecar) {
            Ok(text) => text,
            Err(SourceError::NotFound(_)) => {
                warn!("picture {} has no size file; probing the image", path.display());
                return None;
            }
            Err(e) => {
                warn!("{e}; probing the image");
                return None;
            }
        };

        let mut lines = text.lines();
        let w = parse_dimension(lines.next());
        let h = parse_dimension(lines.next());
        match (w, h) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => {
                warn!("malformed size file {}; probing the image", sidecar.display());
                None
            }
        }
    }

    // ── residency ─────────────────────────────────────────────────────────

    /// Uploads a lazy picture that is registered but not resident.
    pub fn lazy_load(&mut self, backend: &mut dyn RenderBackend, id: PictureId) {
        let Some(p) = self.pictures.get(id) else { return };
        if !p.lazy || p.state != LoadState::LazyPending {
            return;
        }
        let path = p.path.clone();
        let logical_h = p.height;

        let image = match self.source.decode(&path) {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    "failed to lazy load picture {} ({} bytes free): {e}",
                    path.display(),
                    backend.free_memory()
                );
                self.set_failed(id, e.to_string());
                return;
            }
        };

        if let Some(p) = self.pictures.get_mut(id) {
            if p.width == 0 || p.height == 0 {
                p.width = image.width;
                p.height = image.height;
                p.frame_w = image.width;
                p.frame_h = image.height;
            }
        }

        let unit = self.unit_rows(backend);
        let uploaded = if image.height > unit {
            self.upload_split(backend, id, &image)
        } else {
            self.upload_with_supplements(backend, id, &path, image, logical_h.max(1))
        };

        match uploaded {
            Ok(textures) => self.mark_loaded(backend, id, textures),
            Err(e) => {
                warn!(
                    "failed to lazy load picture {} ({} bytes free): {e}",
                    path.display(),
                    backend.free_memory()
                );
                self.set_failed(id, e.to_string());
                return;
            }
        }

        let low_water = self.settings.low_water_bytes;
        if backend.free_memory() < low_water {
            self.free_texture_memory(backend, Some(id));
            if backend.free_memory() < low_water {
                warn!(
                    "picture {} does not fit above the memory low-water mark ({} bytes free)",
                    path.display(),
                    backend.free_memory()
                );
                self.delete_texture(backend, id, true);
                self.set_failed(id, "insufficient video memory".to_string());
            }
        }
    }

    /// Same as [`lazy_load`](Self::lazy_load); used to warm pictures before
    /// they are first drawn.
    pub fn lazy_preload(&mut self, backend: &mut dyn RenderBackend, id: PictureId) {
        self.lazy_load(backend, id);
    }

    /// Releases the textures of a resident lazy picture; size is kept.
    pub fn lazy_unload(&mut self, backend: &mut dyn RenderBackend, id: PictureId) {
        let Some(p) = self.pictures.get(id) else { return };
        if !p.lazy || p.state != LoadState::Loaded {
            return;
        }
        self.delete_texture(backend, id, true);
    }

    /// Releases all backing textures of a picture.
    ///
    /// A lazy unload keeps path and size so the picture can be reloaded;
    /// otherwise the picture is reset to an empty record.
    pub fn delete_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        id: PictureId,
        lazy_unload: bool,
    ) {
        let Some(p) = self.pictures.get_mut(id) else { return };
        for handle in p.textures.iter_mut().filter_map(Option::take) {
            backend.destroy_texture(handle);
        }
        self.chain.unlink(id.index);

        if lazy_unload {
            if p.state == LoadState::Loaded {
                p.state = LoadState::LazyPending;
            }
        } else {
            p.width = 0;
            p.height = 0;
            p.frame_w = 0;
            p.frame_h = 0;
            p.lazy = false;
            p.unit_rows = 0;
            p.state = LoadState::Uninitialized;
        }
    }

    /// Evicts lazy pictures in chain order until free memory reaches the
    /// low-water mark. `keep` is never evicted.
    pub fn free_texture_memory(&mut self, backend: &mut dyn RenderBackend, keep: Option<PictureId>) -> usize {
        self.evict_until(backend, keep, self.settings.low_water_bytes)
    }

    fn evict_until(&mut self, backend: &mut dyn RenderBackend, keep: Option<PictureId>, want: u64) -> usize {
        let candidates: Vec<PictureId> = self
            .chain
            .iter()
            .filter_map(|i| self.pictures.id_at(i))
            .filter(|id| Some(*id) != keep)
            .filter(|id| self.pictures.get(*id).is_some_and(|p| p.lazy))
            .collect();

        let mut evicted = 0;
        for id in candidates {
            if backend.free_memory() >= want {
                break;
            }
            self.lazy_unload(backend, id);
            evicted += 1;
        }
        if evicted > 0 {
            debug!(
                "evicted {evicted} picture(s), {} bytes free",
                backend.free_memory()
            );
        }
        evicted
    }

    /// Releases every resident texture.
    pub fn clear_all(&mut self, backend: &mut dyn RenderBackend) {
        for id in self.loaded() {
            let lazy = self.pictures.get(id).is_some_and(|p| p.lazy);
            self.delete_texture(backend, id, lazy);
        }
    }

    /// Deletes a picture and frees its arena slot; the id becomes stale.
    pub fn forget(&mut self, backend: &mut dyn RenderBackend, id: PictureId) {
        self.delete_texture(backend, id, false);
        self.pictures.remove(id);
    }

    /// Loads a lazy picture if needed; returns whether it is drawable.
    pub fn ensure_resident(&mut self, backend: &mut dyn RenderBackend, id: PictureId) -> bool {
        match self.pictures.get(id).map(|p| p.state) {
            Some(LoadState::Loaded) => true,
            Some(LoadState::LazyPending) => {
                self.lazy_load(backend, id);
                self.pictures.get(id).is_some_and(Picture::is_loaded)
            }
            _ => false,
        }
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn set_failed(&mut self, id: PictureId, message: String) {
        if let Some(p) = self.pictures.get_mut(id) {
            p.fail(message);
        }
    }

    fn set_lazy_pending(&mut self, id: PictureId, w: u32, h: u32) {
        if let Some(p) = self.pictures.get_mut(id) {
            p.lazy = true;
            p.width = w;
            p.height = h;
            p.frame_w = w;
            p.frame_h = h;
            p.state = LoadState::LazyPending;
        }
    }

    fn mark_loaded(
        &mut self,
        backend: &dyn RenderBackend,
        id: PictureId,
        textures: [Option<TextureHandle>; MAX_BACKING_TEXTURES],
    ) {
        let unit = self.unit_rows(backend);
        if let Some(p) = self.pictures.get_mut(id) {
            p.textures = textures;
            p.unit_rows = unit;
            p.state = LoadState::Loaded;
            p.error = None;
        }
        self.chain.link(id.index);
    }

    /// Creates one texture, evicting once and retrying when memory runs out.
    fn create_with_retry(
        &mut self,
        backend: &mut dyn RenderBackend,
        keep: PictureId,
        image: &ImageData,
    ) -> Result<TextureHandle, BackendError> {
        match backend.create_texture(image, TextureFilter::Nearest) {
            Err(BackendError::OutOfMemory { requested, .. }) => {
                let want = requested.max(self.settings.low_water_bytes);
                self.evict_until(backend, Some(keep), want);
                backend.create_texture(image, TextureFilter::Nearest)
            }
            other => other,
        }
    }

    /// Uploads `image`, slicing it into unit-high chunks when it is taller
    /// than one texture.
    fn upload_split(
        &mut self,
        backend: &mut dyn RenderBackend,
        id: PictureId,
        image: &ImageData,
    ) -> Result<[Option<TextureHandle>; MAX_BACKING_TEXTURES], BackendError> {
        let unit = self.unit_rows(backend);
        let mut textures = [None; MAX_BACKING_TEXTURES];

        if image.height <= unit {
            textures[0] = Some(self.create_with_retry(backend, id, image)?);
            return Ok(textures);
        }

        let chunks = image.height.div_ceil(unit);
        if chunks as usize > MAX_BACKING_TEXTURES {
            warn!(
                "picture is {} rows tall; only the first {} are kept",
                image.height,
                unit as usize * MAX_BACKING_TEXTURES
            );
        }

        for k in 0..(chunks as usize).min(MAX_BACKING_TEXTURES) {
            let piece = image.rows(k as u32 * unit, unit);
            match self.create_with_retry(backend, id, &piece) {
                Ok(handle) => textures[k] = Some(handle),
                Err(e) => {
                    release(backend, &mut textures);
                    return Err(e);
                }
            }
        }
        Ok(textures)
    }

    /// Uploads the primary image plus `path1`/`path2` supplements for the
    /// rows beyond the first and second texture units.
    fn upload_with_supplements(
        &mut self,
        backend: &mut dyn RenderBackend,
        id: PictureId,
        path: &Path,
        primary: ImageData,
        logical_h: u32,
    ) -> Result<[Option<TextureHandle>; MAX_BACKING_TEXTURES], BackendError> {
        let unit = self.unit_rows(backend);
        let mut textures = [None; MAX_BACKING_TEXTURES];
        textures[0] = Some(self.create_with_retry(backend, id, &primary)?);
        drop(primary);

        for k in 1..MAX_BACKING_TEXTURES {
            if logical_h <= unit * k as u32 {
                break;
            }
            let mut supplement = path.as_os_str().to_owned();
            supplement.push(k.to_string());
            let supplement = PathBuf::from(supplement);

            let image = match self.source.decode(&supplement) {
                Ok(image) => image,
                Err(e) => {
                    warn!("failed to load picture supplement: {e}");
                    continue;
                }
            };
            match self.create_with_retry(backend, id, &image) {
                Ok(handle) => textures[k] = Some(handle),
                Err(e) => {
                    release(backend, &mut textures);
                    return Err(e);
                }
            }
        }
        Ok(textures)
    }
}

fn release(backend: &mut dyn RenderBackend, textures: &mut [Option<TextureHandle>; MAX_BACKING_TEXTURES]) {
    for handle in textures.iter_mut().filter_map(Option::take) {
        backend.destroy_texture(handle);
    }
}

fn read_list_line(reader: &mut dyn BufRead) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        Err(e) => {
            warn!("failed to read load list: {e}");
            None
        }
    }
}

fn parse_dimension(line: Option<&str>) -> Option<u32> {
    line?
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v <= MAX_LISTED_DIMENSION)
}
