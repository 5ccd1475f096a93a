use image::{ImageBuffer, Rgb};
use phenotag_domain::{pterr, PtResult};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::info;

pub type ViewImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Reads an image from disk. This is the seam tests use to fake or count
/// decodes.
pub trait LoadImage {
    fn read(&self, path: &Path) -> PtResult<ViewImage>;
    fn new() -> PtResult<Self>
    where
        Self: Sized;
}

pub struct ImageFileLoader;
impl LoadImage for ImageFileLoader {
    fn read(&self, path: &Path) -> PtResult<ViewImage> {
        let im = image::open(path)
            .map_err(|e| pterr!("could not read image {:?} due to {:?}", path, e))?;
        Ok(im.into_rgb8())
    }
    fn new() -> PtResult<Self> {
        Ok(Self {})
    }
}

pub trait ImageCache {
    fn load(&mut self, path: &Path) -> PtResult<&ViewImage>;
    fn new(capacity: usize) -> PtResult<Self>
    where
        Self: Sized;
}

/// Keeps the most recently viewed images decoded, bounded by capacity. On
/// overflow the entry that has not been accessed for the longest time is
/// dropped. A decode failure leaves the cache untouched.
pub struct LruImageCache<L>
where
    L: LoadImage,
{
    images: HashMap<PathBuf, ViewImage>,
    access_order: Vec<PathBuf>,
    capacity: usize,
    loader: L,
}
impl<L> LruImageCache<L>
where
    L: LoadImage,
{
    fn with_loader(capacity: usize, loader: L) -> PtResult<Self> {
        if capacity == 0 {
            return Err(pterr!(
                "an image cache with capacity 0 cannot hold the current image"
            ));
        }
        Ok(Self {
            images: HashMap::new(),
            access_order: Vec::new(),
            capacity,
            loader,
        })
    }
    pub fn len(&self) -> usize {
        self.images.len()
    }
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
impl<L> ImageCache for LruImageCache<L>
where
    L: LoadImage,
{
    fn load(&mut self, path: &Path) -> PtResult<&ViewImage> {
        if !self.images.contains_key(path) {
            let im = self.loader.read(path)?;
            if self.images.len() >= self.capacity {
                let evicted = self.access_order.remove(0);
                self.images.remove(&evicted);
                info!("dropped {evicted:?} from the image cache");
            }
            self.images.insert(path.to_path_buf(), im);
        }
        self.access_order.retain(|p| p != path);
        self.access_order.push(path.to_path_buf());
        self.images
            .get(path)
            .ok_or_else(|| pterr!("no cached image for {:?}", path))
    }
    fn new(capacity: usize) -> PtResult<Self> {
        Self::with_loader(capacity, L::new()?)
    }
}

#[cfg(test)]
use {
    crate::tracing_setup::init_tracing_for_tests,
    std::{cell::Cell, rc::Rc},
};

#[cfg(test)]
struct CountingLoader {
    n_reads: Rc<Cell<usize>>,
}
#[cfg(test)]
impl LoadImage for CountingLoader {
    fn read(&self, _: &Path) -> PtResult<ViewImage> {
        self.n_reads.set(self.n_reads.get() + 1);
        Ok(ViewImage::new(8, 8))
    }
    fn new() -> PtResult<Self> {
        Ok(Self {
            n_reads: Rc::new(Cell::new(0)),
        })
    }
}

#[test]
fn test_lru_eviction() {
    init_tracing_for_tests();
    let n_reads = Rc::new(Cell::new(0));
    let loader = CountingLoader {
        n_reads: n_reads.clone(),
    };
    let mut cache = LruImageCache::with_loader(2, loader).unwrap();
    let (a, b, c) = (Path::new("a.jpg"), Path::new("b.jpg"), Path::new("c.jpg"));
    cache.load(a).unwrap();
    cache.load(b).unwrap();
    assert_eq!(n_reads.get(), 2);
    // touch a so that b becomes the least recently used entry
    cache.load(a).unwrap();
    assert_eq!(n_reads.get(), 2);
    cache.load(c).unwrap();
    assert_eq!(n_reads.get(), 3);
    assert_eq!(cache.len(), 2);
    cache.load(a).unwrap();
    assert_eq!(n_reads.get(), 3);
    // b was evicted and needs a fresh decode
    cache.load(b).unwrap();
    assert_eq!(n_reads.get(), 4);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_zero_capacity_rejected() {
    assert!(LruImageCache::<ImageFileLoader>::new(0).is_err());
}

#[test]
fn test_read_error_leaves_cache_untouched() {
    let mut cache = LruImageCache::<ImageFileLoader>::new(2).unwrap();
    assert!(cache.load(Path::new("surely-not-an-image.jpg")).is_err());
    assert!(cache.is_empty());
}
