use crate::annotation::AnnotationStore;
use crate::cache::{ImageCache, ViewImage};
use crate::file_util::path_to_str;
use crate::record_io;
use crate::result::trace_ok_warn;
use phenotag_domain::{pterr, to_pt, PtResult};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};
use tracing::info;

fn next(image_selected_idx: usize, images_len: usize) -> usize {
    if image_selected_idx < images_len - 1 {
        image_selected_idx + 1
    } else {
        images_len - 1
    }
}

fn prev(image_selected_idx: usize, images_len: usize) -> usize {
    if image_selected_idx >= images_len {
        images_len - 1
    } else if image_selected_idx > 0 {
        image_selected_idx - 1
    } else {
        0
    }
}

/// Owns the image list, the annotation store of the active image, and the
/// pixel cache. The store is written back before the active image changes,
/// so no edit is lost by navigating or quitting.
pub struct Session<C>
where
    C: ImageCache,
{
    image_paths: Vec<PathBuf>,
    current_idx: usize,
    store: AnnotationStore,
    save_dir: PathBuf,
    cache: C,
}

impl<C> Session<C>
where
    C: ImageCache,
{
    /// Starts on the first image of the list and loads its annotations if
    /// there are any on disk.
    pub fn new(image_paths: Vec<PathBuf>, save_dir: PathBuf, cache: C) -> PtResult<Self> {
        if image_paths.is_empty() {
            return Err(pterr!("cannot start a session without images"));
        }
        let mut session = Session {
            image_paths,
            current_idx: 0,
            store: AnnotationStore::default(),
            save_dir,
            cache,
        };
        session.store = session.load_store(0)?;
        trace_ok_warn(session.current_image());
        Ok(session)
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }
    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }
    pub fn current_idx(&self) -> usize {
        self.current_idx
    }
    pub fn image_count(&self) -> usize {
        self.image_paths.len()
    }
    pub fn current_image_path(&self) -> &Path {
        &self.image_paths[self.current_idx]
    }
    pub fn current_image_name(&self) -> &str {
        self.current_image_path()
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or("")
    }
    /// The decoded pixels of the active image, straight from the cache.
    /// Annotation state never depends on this, a decode failure only means
    /// there is nothing to show.
    pub fn current_image(&mut self) -> PtResult<&ViewImage> {
        self.cache.load(&self.image_paths[self.current_idx])
    }

    fn load_store(&self, idx: usize) -> PtResult<AnnotationStore> {
        let image_path = path_to_str(&self.image_paths[idx])?;
        let anno_path =
            record_io::annotation_file_path(image_path, &self.save_dir).map_err(to_pt)?;
        record_io::load(&anno_path).map_err(to_pt)
    }

    /// Writes the current store to its annotation file. The image stays
    /// dirty if this fails, the caller decides whether that is fatal.
    pub fn flush(&self) -> PtResult<()> {
        let image_path = path_to_str(self.current_image_path())?;
        record_io::save(&self.store, image_path, &self.save_dir).map_err(to_pt)
    }

    fn goto(&mut self, idx: usize) -> PtResult<()> {
        self.flush()?;
        self.store = self.load_store(idx)?;
        self.current_idx = idx;
        trace_ok_warn(self.current_image());
        Ok(())
    }

    /// Returns whether the image actually changed. At the last image the
    /// gesture is ignored.
    pub fn next_image(&mut self) -> PtResult<bool> {
        let idx = next(self.current_idx, self.image_paths.len());
        if idx == self.current_idx {
            info!("already at the last image");
            Ok(false)
        } else {
            self.goto(idx)?;
            Ok(true)
        }
    }
    /// Returns whether the image actually changed. At the first image the
    /// gesture is ignored.
    pub fn prev_image(&mut self) -> PtResult<bool> {
        let idx = prev(self.current_idx, self.image_paths.len());
        if idx == self.current_idx {
            info!("already at the first image");
            Ok(false)
        } else {
            self.goto(idx)?;
            Ok(true)
        }
    }
}

#[cfg(test)]
use crate::{
    cache::{LoadImage, LruImageCache},
    defer_folder_removal,
    file_util::DEFAULT_TMPDIR,
    tracing_setup::init_tracing_for_tests,
};
#[cfg(test)]
use std::fs;

#[cfg(test)]
struct DummyLoad;
#[cfg(test)]
impl LoadImage for DummyLoad {
    fn read(&self, _: &Path) -> PtResult<ViewImage> {
        Ok(ViewImage::new(4, 4))
    }
    fn new() -> PtResult<Self> {
        Ok(Self {})
    }
}

#[test]
fn test_prev_next() {
    assert_eq!(next(3, 4), 3);
    assert_eq!(next(2, 4), 3);
    assert_eq!(next(5, 4), 3);
    assert_eq!(next(1, 4), 2);
    assert_eq!(prev(3, 4), 2);
    assert_eq!(prev(2, 3), 1);
    assert_eq!(prev(3, 3), 2);
    assert_eq!(prev(4, 3), 2);
    assert_eq!(prev(9, 3), 2);
}

#[test]
fn test_navigation_boundaries() {
    init_tracing_for_tests();
    let folder = DEFAULT_TMPDIR.join("test_session_nav");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    let paths = vec![folder.join("a.jpg"), folder.join("b.jpg")];
    let cache = LruImageCache::<DummyLoad>::new(2).unwrap();
    let mut session = Session::new(paths, folder.clone(), cache).unwrap();
    assert_eq!(session.current_image_name(), "a.jpg");
    assert_eq!((session.current_idx(), session.image_count()), (0, 2));
    assert!(!session.prev_image().unwrap());
    assert!(session.next_image().unwrap());
    assert_eq!(session.current_image_name(), "b.jpg");
    assert!(!session.next_image().unwrap());
    assert!(session.prev_image().unwrap());
    assert_eq!(session.current_image_name(), "a.jpg");
}

#[test]
fn test_session_needs_images() {
    let cache = LruImageCache::<DummyLoad>::new(2).unwrap();
    assert!(Session::new(vec![], DEFAULT_TMPDIR.clone(), cache).is_err());
}
