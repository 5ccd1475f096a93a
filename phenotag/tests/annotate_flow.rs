use std::{fs, path::Path};

use ptlib::{
    cache::{ImageCache, LoadImage, LruImageCache, ViewImage},
    defer_folder_removal,
    events::parse_gesture,
    file_util::DEFAULT_TMPDIR,
    tracing_setup::init_tracing_for_tests,
    EditController, Gesture, PtResult, Session,
};

struct DummyLoad;
impl LoadImage for DummyLoad {
    fn read(&self, _: &Path) -> PtResult<ViewImage> {
        Ok(ViewImage::new(16, 16))
    }
    fn new() -> PtResult<Self> {
        Ok(Self {})
    }
}

fn make_session(subfolder: &str, image_names: &[&str]) -> Session<LruImageCache<DummyLoad>> {
    init_tracing_for_tests();
    let folder = DEFAULT_TMPDIR.join(subfolder);
    fs::create_dir_all(&folder).unwrap();
    let paths = image_names.iter().map(|name| folder.join(name)).collect();
    let cache = LruImageCache::<DummyLoad>::new(2).unwrap();
    Session::new(paths, folder, cache).unwrap()
}

fn drive(ctrl: &mut EditController, session: &mut Session<LruImageCache<DummyLoad>>, script: &str) {
    for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let gesture = parse_gesture(line).unwrap();
        ctrl.handle_gesture(gesture, session).unwrap();
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_stem_point_then_navigate() {
    let folder = DEFAULT_TMPDIR.join("test_flow_two_images");
    let mut session = make_session("test_flow_two_images", &["a.jpg", "b.jpg"]);
    defer_folder_removal!(&folder);
    let mut ctrl = EditController::new(vec!["bean".to_string()]).unwrap();
    drive(
        &mut ctrl,
        &mut session,
        "point 10 10
         next",
    );
    // navigating away flushed a.jpg
    let json = read_json(&folder.join("a.json"));
    assert_eq!(json["image_name"], "a.jpg");
    let crops = json["crops"].as_array().unwrap();
    assert_eq!(crops.len(), 1);
    assert_eq!(crops[0]["label"], "bean");
    assert_eq!(crops[0]["box"], serde_json::Value::Null);
    let parts = crops[0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0]["kind"], "stem");
    assert_eq!(parts[0]["location"]["x"], 10);
    assert_eq!(parts[0]["location"]["y"], 10);
    // nothing was annotated on b.jpg, so quitting must not create a file
    ctrl.handle_gesture(Gesture::Quit, &mut session).unwrap();
    assert!(!folder.join("b.json").exists());
}

#[test]
fn test_reversed_box_drag_encoding() {
    let folder = DEFAULT_TMPDIR.join("test_flow_reversed_box");
    let mut session = make_session("test_flow_reversed_box", &["a.jpg"]);
    defer_folder_removal!(&folder);
    let mut ctrl = EditController::new(vec!["bean".to_string()]).unwrap();
    drive(
        &mut ctrl,
        &mut session,
        "box-begin 5 5
         box-drag 3 2
         box-end 1 1
         quit",
    );
    let json = read_json(&folder.join("a.json"));
    let bx = &json["crops"][0]["box"];
    assert_eq!(bx["x_min"], 1);
    assert_eq!(bx["y_min"], 1);
    assert_eq!(bx["x_max"], 5);
    assert_eq!(bx["y_max"], 5);
}

#[test]
fn test_emptied_first_entry_keeps_second_on_save() {
    // the store prunes per entry, an emptied first plant must not cost the
    // annotator the second one
    let folder = DEFAULT_TMPDIR.join("test_flow_pruning");
    let mut session = make_session("test_flow_pruning", &["a.jpg"]);
    defer_folder_removal!(&folder);
    let labels = vec!["maize".to_string(), "bean".to_string()];
    let mut ctrl = EditController::new(labels).unwrap();
    drive(
        &mut ctrl,
        &mut session,
        "point 1 1
         commit
         label 2
         point 2 2
         quit",
    );
    let json = read_json(&folder.join("a.json"));
    assert_eq!(json["crops"].as_array().unwrap().len(), 2);

    // reopen, empty out the first plant, save again
    let cache = LruImageCache::<DummyLoad>::new(2).unwrap();
    let mut session =
        Session::new(vec![folder.join("a.jpg")], folder.clone(), cache).unwrap();
    let mut ctrl = EditController::new(vec!["maize".to_string()]).unwrap();
    assert_eq!(session.store().len(), 2);
    drive(
        &mut ctrl,
        &mut session,
        "undo
         quit",
    );
    let json = read_json(&folder.join("a.json"));
    let crops = json["crops"].as_array().unwrap();
    assert_eq!(crops.len(), 1);
    assert_eq!(crops[0]["label"], "bean");
}

#[test]
fn test_roundtrip_across_reopen() {
    let folder = DEFAULT_TMPDIR.join("test_flow_roundtrip");
    let mut session = make_session("test_flow_roundtrip", &["a.jpg"]);
    defer_folder_removal!(&folder);
    let labels = vec!["maize".to_string(), "bean".to_string()];
    let mut ctrl = EditController::new(labels.clone()).unwrap();
    drive(
        &mut ctrl,
        &mut session,
        "point 10 20
         point 30 40
         box-begin 50 60
         box-end 40 50
         commit
         label 2
         point 7 8
         quit",
    );
    let cache = LruImageCache::<DummyLoad>::new(2).unwrap();
    let mut reopened =
        Session::new(vec![folder.join("a.jpg")], folder.clone(), cache).unwrap();
    let store = reopened.store();
    assert_eq!(store.len(), 2);
    assert_eq!(store.target_index(), Some(0));
    let first = &store.annotations()[0];
    assert_eq!(first.label, "maize");
    assert_eq!(first.points.len(), 2);
    assert_eq!(first.points[0].kind, ptlib::PartKind::Stem);
    assert_eq!(first.points[1].kind, ptlib::PartKind::Leaf);
    let bx = first.bbox.unwrap();
    assert_eq!((bx.x_min(), bx.y_min(), bx.x_max(), bx.y_max()), (40, 50, 50, 60));
    let second = &store.annotations()[1];
    assert_eq!(second.label, "bean");
    assert_eq!(second.points[0].kind, ptlib::PartKind::Stem);
    // appending to the reopened store continues the leaf sequence
    let mut ctrl = EditController::new(labels).unwrap();
    ctrl.handle_gesture(Gesture::PointCommit { x: 1, y: 1 }, &mut reopened)
        .unwrap();
    assert_eq!(
        reopened.store().annotations()[0].points[2].kind,
        ptlib::PartKind::Leaf
    );
    ctrl.handle_gesture(Gesture::Quit, &mut reopened).unwrap();
}
