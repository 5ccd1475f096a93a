use phenotag_domain::{pterr, BoxCorners, PartKind, Point, PtResult};
use tracing::info;

/// One plant instance on the image. The box spans the whole plant if one was
/// dragged, the points mark individual parts of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlantAnnotation {
    pub label: String,
    pub bbox: Option<BoxCorners>,
    pub points: Vec<Point>,
}
impl PlantAnnotation {
    pub fn new(label: String) -> Self {
        PlantAnnotation {
            label,
            bbox: None,
            points: Vec::new(),
        }
    }
    /// Empty means neither a box nor any point has been placed yet.
    pub fn is_empty(&self) -> bool {
        self.bbox.is_none() && self.points.is_empty()
    }
    /// The first mark on a fresh plant is its stem, everything afterwards is
    /// a leaf. The kind is fixed at append time and never recomputed.
    fn append_point(&mut self, x: u32, y: u32) {
        let kind = if self.is_empty() {
            PartKind::Stem
        } else {
            PartKind::Leaf
        };
        self.points.push(Point { kind, x, y });
    }
}

/// All plants annotated on one image plus the index edits currently go to.
/// This is not an undo history. `undo_one_step` collapses the target in
/// reverse build order (box, then points, then the entry itself) and nothing
/// can be redone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationStore {
    annotations: Vec<PlantAnnotation>,
    target_index: Option<usize>,
}

impl AnnotationStore {
    pub fn new(annotations: Vec<PlantAnnotation>) -> Self {
        let target_index = if annotations.is_empty() { None } else { Some(0) };
        AnnotationStore {
            annotations,
            target_index,
        }
    }
    pub fn annotations(&self) -> &[PlantAnnotation] {
        &self.annotations
    }
    pub fn target_index(&self) -> Option<usize> {
        self.target_index
    }
    pub fn target(&self) -> Option<&PlantAnnotation> {
        self.target_index.map(|idx| &self.annotations[idx])
    }
    fn target_mut(&mut self) -> PtResult<&mut PlantAnnotation> {
        match self.target_index {
            Some(idx) => Ok(&mut self.annotations[idx]),
            None => Err(pterr!("nothing to edit, the store is empty")),
        }
    }
    pub fn len(&self) -> usize {
        self.annotations.len()
    }
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// The first edit on an image without annotations creates the first
    /// entry on demand. No-op as soon as any entry exists.
    pub fn create_target_if_absent(&mut self, label: &str) {
        if self.annotations.is_empty() {
            self.annotations
                .push(PlantAnnotation::new(label.to_string()));
            self.target_index = Some(0);
        }
    }
    pub fn append_point(&mut self, x: u32, y: u32) -> PtResult<()> {
        self.target_mut()?.append_point(x, y);
        Ok(())
    }
    pub fn set_target_box(&mut self, bbox: BoxCorners) -> PtResult<()> {
        self.target_mut()?.bbox = Some(bbox);
        Ok(())
    }
    pub fn update_target_box_tail(&mut self, x: u32, y: u32) -> PtResult<()> {
        let target = self.target_mut()?;
        match &mut target.bbox {
            Some(bbox) => {
                bbox.update_tail(x, y);
                Ok(())
            }
            None => Err(pterr!("no box on the current annotation to update")),
        }
    }
    /// Seals the target if it holds any data and starts a fresh entry which
    /// becomes the new target. Nothing happens on an empty store or an empty
    /// target. Returns whether a new entry was started.
    pub fn commit_and_start_new(&mut self, label: &str) -> bool {
        match self.target() {
            Some(t) if !t.is_empty() => {
                self.annotations
                    .push(PlantAnnotation::new(label.to_string()));
                self.target_index = Some(self.annotations.len() - 1);
                true
            }
            _ => {
                info!("nothing to commit");
                false
            }
        }
    }
    /// Removes the most recently added piece of the target, its box if one
    /// exists, else its last point, else the entry itself. Removing the entry
    /// retargets to the previous index modulo the new length. Returns whether
    /// anything was removed.
    pub fn undo_one_step(&mut self) -> bool {
        match self.target_index {
            None => {
                info!("undo on an empty store");
                false
            }
            Some(idx) => {
                let target = &mut self.annotations[idx];
                if target.bbox.is_some() {
                    target.bbox = None;
                } else if !target.points.is_empty() {
                    target.points.pop();
                } else {
                    self.annotations.remove(idx);
                    self.target_index = if self.annotations.is_empty() {
                        None
                    } else if idx == 0 {
                        Some(self.annotations.len() - 1)
                    } else {
                        Some(idx - 1)
                    };
                }
                true
            }
        }
    }
    /// Moves the target by `delta` entries, wrapping around at both ends.
    pub fn retarget(&mut self, delta: isize) {
        match self.target_index {
            Some(idx) => {
                let len = self.annotations.len() as isize;
                self.target_index = Some((idx as isize + delta).rem_euclid(len) as usize);
            }
            None => {
                info!("retarget on an empty store");
            }
        }
    }
    /// Relabels the target in place, its points and box stay as they are.
    pub fn relabel_target(&mut self, label: &str) {
        if let Some(idx) = self.target_index {
            self.annotations[idx].label = label.to_string();
        }
    }
}

#[test]
fn test_stem_assignment() {
    let mut store = AnnotationStore::default();
    store.create_target_if_absent("maize");
    store.append_point(2, 3).unwrap();
    store.append_point(4, 5).unwrap();
    store.append_point(6, 7).unwrap();
    let kinds = store.annotations()[0]
        .points
        .iter()
        .map(|p| p.kind)
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec![PartKind::Stem, PartKind::Leaf, PartKind::Leaf]);

    // a box placed before any point makes the first point a leaf
    let mut store = AnnotationStore::default();
    store.create_target_if_absent("maize");
    store.set_target_box(BoxCorners::new(0, 0)).unwrap();
    store.append_point(2, 3).unwrap();
    assert_eq!(store.annotations()[0].points[0].kind, PartKind::Leaf);
}

#[test]
fn test_empty_store() {
    let mut store = AnnotationStore::default();
    assert!(store.append_point(1, 1).is_err());
    assert!(store.set_target_box(BoxCorners::new(1, 1)).is_err());
    assert!(store.update_target_box_tail(2, 2).is_err());
    assert!(!store.undo_one_step());
    assert!(!store.commit_and_start_new("x"));
    store.retarget(1);
    assert_eq!(store.target_index(), None);
}

#[test]
fn test_box_tail_requires_box() {
    let mut store = AnnotationStore::default();
    store.create_target_if_absent("x");
    assert!(store.update_target_box_tail(2, 2).is_err());
}

#[test]
fn test_commit() {
    let mut store = AnnotationStore::default();
    store.create_target_if_absent("a");
    assert!(!store.commit_and_start_new("a"));
    assert_eq!(store.len(), 1);
    store.append_point(1, 1).unwrap();
    assert!(store.commit_and_start_new("b"));
    assert_eq!(store.len(), 2);
    assert_eq!(store.target_index(), Some(1));
    assert_eq!(store.annotations()[1].label, "b");
    assert!(store.annotations()[1].is_empty());
    // creating on demand is a no-op once entries exist
    store.create_target_if_absent("c");
    assert_eq!(store.len(), 2);
}

#[test]
fn test_undo_tiers() {
    let mut store = AnnotationStore::default();
    store.create_target_if_absent("a");
    store.append_point(1, 1).unwrap();
    store.append_point(2, 2).unwrap();
    store.set_target_box(BoxCorners::new(5, 5)).unwrap();
    assert!(store.undo_one_step()); // box goes first
    assert!(store.annotations()[0].bbox.is_none());
    assert_eq!(store.annotations()[0].points.len(), 2);
    assert!(store.undo_one_step()); // then the points in reverse
    assert_eq!(store.annotations()[0].points.len(), 1);
    assert!(store.undo_one_step());
    assert!(store.annotations()[0].points.is_empty());
    assert!(store.undo_one_step()); // then the entry itself
    assert!(store.is_empty());
    assert_eq!(store.target_index(), None);
}

#[test]
fn test_undo_retargets_with_wraparound() {
    let mut store = AnnotationStore::default();
    store.create_target_if_absent("a");
    store.append_point(1, 1).unwrap();
    store.commit_and_start_new("b");
    store.append_point(2, 2).unwrap();
    store.commit_and_start_new("c");
    store.append_point(3, 3).unwrap();
    store.retarget(1); // wraps from the last entry to the first
    assert_eq!(store.target_index(), Some(0));
    assert!(store.undo_one_step());
    assert!(store.undo_one_step());
    assert_eq!(store.len(), 2);
    assert_eq!(store.target_index(), Some(1));
    assert_eq!(store.target().unwrap().label, "c");
}

#[test]
fn test_retarget_wraps_both_ways() {
    let mut store = AnnotationStore::new(vec![
        PlantAnnotation::new("a".to_string()),
        PlantAnnotation::new("b".to_string()),
        PlantAnnotation::new("c".to_string()),
    ]);
    assert_eq!(store.target_index(), Some(0));
    store.retarget(-1);
    assert_eq!(store.target_index(), Some(2));
    store.retarget(1);
    assert_eq!(store.target_index(), Some(0));
    store.retarget(7);
    assert_eq!(store.target_index(), Some(1));
    store.retarget(-4);
    assert_eq!(store.target_index(), Some(0));
}

#[test]
fn test_relabel() {
    let mut store = AnnotationStore::default();
    store.relabel_target("x");
    store.create_target_if_absent("a");
    store.append_point(1, 1).unwrap();
    store.relabel_target("bean");
    assert_eq!(store.target().unwrap().label, "bean");
}
