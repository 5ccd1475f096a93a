use crate::annotation::PlantAnnotation;
use crate::cache::ImageCache;
use crate::events::Gesture;
use crate::session::Session;
use phenotag_domain::{pterr, BoxCorners, PtResult};
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum EditState {
    #[default]
    Idle,
    PlacingBox,
}

/// Whether a handled gesture changed anything a renderer would show. The
/// caller decides if a fresh frame is worth drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChange {
    Changed,
    Unchanged,
}

/// Read-only view of everything a renderer needs for one frame.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub annotations: &'a [PlantAnnotation],
    pub target_index: Option<usize>,
    pub active_label: &'a str,
    pub cursor: Option<(u32, u32)>,
    pub image_name: &'a str,
}

/// Maps gestures to store mutations. The controller makes sure a target
/// exists before any point or box operation and leaves the box-placing
/// state whenever a gesture might have invalidated the box in progress.
pub struct EditController {
    state: EditState,
    labels: Vec<String>,
    active_label_idx: usize,
    cursor: Option<(u32, u32)>,
}

impl EditController {
    pub fn new(labels: Vec<String>) -> PtResult<Self> {
        if labels.is_empty() {
            Err(pterr!("at least one label is needed"))
        } else {
            Ok(EditController {
                state: EditState::Idle,
                labels,
                active_label_idx: 0,
                cursor: None,
            })
        }
    }

    pub fn active_label(&self) -> &str {
        &self.labels[self.active_label_idx]
    }

    pub fn snapshot<'a, C>(&'a self, session: &'a Session<C>) -> Snapshot<'a>
    where
        C: ImageCache,
    {
        Snapshot {
            annotations: session.store().annotations(),
            target_index: session.store().target_index(),
            active_label: self.active_label(),
            cursor: self.cursor,
            image_name: session.current_image_name(),
        }
    }

    pub fn handle_gesture<C>(
        &mut self,
        gesture: Gesture,
        session: &mut Session<C>,
    ) -> PtResult<StateChange>
    where
        C: ImageCache,
    {
        let change = match gesture {
            Gesture::PointCommit { x, y } => {
                self.state = EditState::Idle;
                self.cursor = Some((x, y));
                session.store_mut().create_target_if_absent(self.active_label());
                session.store_mut().append_point(x, y)?;
                StateChange::Changed
            }
            Gesture::BoxBegin { x, y } => {
                self.cursor = Some((x, y));
                session.store_mut().create_target_if_absent(self.active_label());
                session.store_mut().set_target_box(BoxCorners::new(x, y))?;
                self.state = EditState::PlacingBox;
                StateChange::Changed
            }
            Gesture::BoxDrag { x, y } | Gesture::CursorMove { x, y } => {
                self.cursor = Some((x, y));
                if self.state == EditState::PlacingBox {
                    session.store_mut().update_target_box_tail(x, y)?;
                }
                StateChange::Changed
            }
            Gesture::BoxEnd { x, y } => {
                self.cursor = Some((x, y));
                if self.state == EditState::PlacingBox {
                    session.store_mut().update_target_box_tail(x, y)?;
                    self.state = EditState::Idle;
                    StateChange::Changed
                } else {
                    info!("box end without a box in progress");
                    StateChange::Unchanged
                }
            }
            Gesture::LabelSelect(n) => {
                if n >= 1 && n <= self.labels.len() {
                    self.active_label_idx = n - 1;
                    session.store_mut().relabel_target(self.active_label());
                    StateChange::Changed
                } else {
                    info!("no label configured for key {n}");
                    StateChange::Unchanged
                }
            }
            Gesture::Undo => {
                self.state = EditState::Idle;
                if session.store_mut().undo_one_step() {
                    StateChange::Changed
                } else {
                    StateChange::Unchanged
                }
            }
            Gesture::Commit => {
                self.state = EditState::Idle;
                if session.store_mut().commit_and_start_new(self.active_label()) {
                    StateChange::Changed
                } else {
                    StateChange::Unchanged
                }
            }
            Gesture::NextImage => {
                self.state = EditState::Idle;
                if session.next_image()? {
                    StateChange::Changed
                } else {
                    StateChange::Unchanged
                }
            }
            Gesture::PrevImage => {
                self.state = EditState::Idle;
                if session.prev_image()? {
                    StateChange::Changed
                } else {
                    StateChange::Unchanged
                }
            }
            Gesture::Quit => {
                self.state = EditState::Idle;
                session.flush()?;
                StateChange::Unchanged
            }
        };
        Ok(change)
    }
}

#[cfg(test)]
use crate::{
    cache::{LoadImage, LruImageCache, ViewImage},
    file_util::DEFAULT_TMPDIR,
    tracing_setup::init_tracing_for_tests,
};
#[cfg(test)]
use phenotag_domain::PartKind;
#[cfg(test)]
use std::path::Path;

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

#[cfg(test)]
fn make_session(subfolder: &str) -> Session<LruImageCache<DummyLoad>> {
    init_tracing_for_tests();
    let folder = DEFAULT_TMPDIR.join(subfolder);
    let paths = vec![folder.join("a.jpg")];
    let cache = LruImageCache::<DummyLoad>::new(2).unwrap();
    Session::new(paths, folder, cache).unwrap()
}

#[test]
fn test_point_kinds_via_gestures() {
    let mut session = make_session("test_ctrl_points");
    let mut ctrl = EditController::new(vec!["maize".to_string()]).unwrap();
    ctrl.handle_gesture(Gesture::PointCommit { x: 10, y: 10 }, &mut session)
        .unwrap();
    ctrl.handle_gesture(Gesture::PointCommit { x: 20, y: 20 }, &mut session)
        .unwrap();
    let target = session.store().target().unwrap();
    assert_eq!(target.label, "maize");
    assert_eq!(target.points[0].kind, PartKind::Stem);
    assert_eq!(target.points[1].kind, PartKind::Leaf);
    let snapshot = ctrl.snapshot(&session);
    assert_eq!(snapshot.image_name, "a.jpg");
    assert_eq!(snapshot.active_label, "maize");
    assert_eq!(snapshot.cursor, Some((20, 20)));
}

#[test]
fn test_box_drag_state_machine() {
    let mut session = make_session("test_ctrl_box");
    let mut ctrl = EditController::new(vec!["maize".to_string()]).unwrap();
    ctrl.handle_gesture(Gesture::BoxBegin { x: 5, y: 5 }, &mut session)
        .unwrap();
    ctrl.handle_gesture(Gesture::BoxDrag { x: 3, y: 3 }, &mut session)
        .unwrap();
    let change = ctrl
        .handle_gesture(Gesture::BoxEnd { x: 1, y: 1 }, &mut session)
        .unwrap();
    assert_eq!(change, StateChange::Changed);
    let bbox = session.store().target().unwrap().bbox.unwrap();
    assert_eq!((bbox.x_min(), bbox.y_min()), (1, 1));
    assert_eq!((bbox.x_max(), bbox.y_max()), (5, 5));
    // a second release is not part of any drag
    let change = ctrl
        .handle_gesture(Gesture::BoxEnd { x: 2, y: 2 }, &mut session)
        .unwrap();
    assert_eq!(change, StateChange::Unchanged);
    assert_eq!(session.store().target().unwrap().bbox.unwrap().x_min(), 1);
}

#[test]
fn test_label_select() {
    let mut session = make_session("test_ctrl_label");
    let labels = vec!["maize".to_string(), "bean".to_string()];
    let mut ctrl = EditController::new(labels).unwrap();
    ctrl.handle_gesture(Gesture::PointCommit { x: 1, y: 1 }, &mut session)
        .unwrap();
    let change = ctrl
        .handle_gesture(Gesture::LabelSelect(2), &mut session)
        .unwrap();
    assert_eq!(change, StateChange::Changed);
    assert_eq!(ctrl.active_label(), "bean");
    assert_eq!(session.store().target().unwrap().label, "bean");
    let change = ctrl
        .handle_gesture(Gesture::LabelSelect(9), &mut session)
        .unwrap();
    assert_eq!(change, StateChange::Unchanged);
    assert_eq!(ctrl.active_label(), "bean");
}

#[test]
fn test_undo_mid_drag_leaves_placing_state() {
    let mut session = make_session("test_ctrl_undo");
    let mut ctrl = EditController::new(vec!["maize".to_string()]).unwrap();
    ctrl.handle_gesture(Gesture::BoxBegin { x: 5, y: 5 }, &mut session)
        .unwrap();
    ctrl.handle_gesture(Gesture::BoxDrag { x: 7, y: 7 }, &mut session)
        .unwrap();
    let change = ctrl.handle_gesture(Gesture::Undo, &mut session).unwrap();
    assert_eq!(change, StateChange::Changed);
    // the drag ended with the undo, further motion must not touch the store
    ctrl.handle_gesture(Gesture::BoxDrag { x: 9, y: 9 }, &mut session)
        .unwrap();
    assert_eq!(session.store().target().unwrap().bbox, None);
}
