use crate::annotation::{AnnotationStore, PlantAnnotation};
use crate::file_util::osstr_to_str;
use phenotag_domain::{BoxCorners, PartKind, Point};
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

/// Failure modes of reading and writing annotation files.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid format: {message}")]
    InvalidFormat { message: String },
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AnnotationRecord {
    pub(crate) image_name: String,
    pub(crate) image_path: String,
    pub(crate) crops: Vec<CropRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct CropRecord {
    pub(crate) label: String,
    #[serde(rename = "box", default)]
    pub(crate) bbox: Option<BoxRecord>,
    pub(crate) parts: Vec<PartRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct BoxRecord {
    pub(crate) x_min: u32,
    pub(crate) y_min: u32,
    pub(crate) x_max: u32,
    pub(crate) y_max: u32,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct PartRecord {
    pub(crate) kind: PartKind,
    pub(crate) location: LocationRecord,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct LocationRecord {
    pub(crate) x: u32,
    pub(crate) y: u32,
}

fn to_crop(a: &PlantAnnotation) -> CropRecord {
    CropRecord {
        label: a.label.clone(),
        bbox: a.bbox.map(|b| BoxRecord {
            x_min: b.x_min(),
            y_min: b.y_min(),
            x_max: b.x_max(),
            y_max: b.y_max(),
        }),
        parts: a
            .points
            .iter()
            .map(|p| PartRecord {
                kind: p.kind,
                location: LocationRecord { x: p.x, y: p.y },
            })
            .collect(),
    }
}

/// Builds the file record for a store. Entries without any data are dropped.
/// If nothing with data is left there is nothing worth a file and `None` is
/// returned.
pub fn encode(store: &AnnotationStore, image_path: &str) -> Option<AnnotationRecord> {
    let crops = store
        .annotations()
        .iter()
        .filter(|a| !a.is_empty())
        .map(to_crop)
        .collect::<Vec<_>>();
    if crops.is_empty() {
        None
    } else {
        let image_name = Path::new(image_path)
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(image_path);
        Some(AnnotationRecord {
            image_name: image_name.to_string(),
            image_path: image_path.to_string(),
            crops,
        })
    }
}

/// Rebuilds a store from a file record. Part kinds are taken as stored and
/// the first entry becomes the target.
pub fn decode(record: AnnotationRecord) -> AnnotationStore {
    let annotations = record
        .crops
        .into_iter()
        .map(|crop| PlantAnnotation {
            label: crop.label,
            bbox: crop.bbox.map(|b| BoxCorners {
                x: b.x_min,
                y: b.y_min,
                x2: b.x_max,
                y2: b.y_max,
            }),
            points: crop
                .parts
                .into_iter()
                .map(|part| Point {
                    kind: part.kind,
                    x: part.location.x,
                    y: part.location.y,
                })
                .collect(),
        })
        .collect();
    AnnotationStore::new(annotations)
}

/// Path of the annotation file belonging to an image, the image stem with a
/// json extension inside the save directory.
pub fn annotation_file_path(image_path: &str, save_dir: &Path) -> Result<PathBuf, FormatError> {
    let stem = osstr_to_str(Path::new(image_path).file_stem())?;
    Ok(save_dir.join(format!("{stem}.json")))
}

/// Writes the record for the store, or removes a stale annotation file if
/// the store has no content left.
pub fn save(store: &AnnotationStore, image_path: &str, save_dir: &Path) -> Result<(), FormatError> {
    let path = annotation_file_path(image_path, save_dir)?;
    match encode(store, image_path) {
        Some(record) => {
            fs::create_dir_all(save_dir)?;
            let json_str = serde_json::to_string_pretty(&record)?;
            fs::write(&path, json_str)?;
            info!("saved annotations to {path:?}");
        }
        None => {
            if path.exists() {
                fs::remove_file(&path)?;
                info!("removed annotation file {path:?}, all entries are empty");
            }
        }
    }
    Ok(())
}

/// Reads the store for an image. An absent file simply means no annotations
/// yet.
pub fn load(annotation_path: &Path) -> Result<AnnotationStore, FormatError> {
    if !annotation_path.exists() {
        return Ok(AnnotationStore::default());
    }
    let json_str = fs::read_to_string(annotation_path)?;
    let record = serde_json::from_str::<AnnotationRecord>(&json_str)?;
    info!("loaded annotations from {annotation_path:?}");
    Ok(decode(record))
}

#[cfg(test)]
use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};

#[cfg(test)]
fn make_store() -> AnnotationStore {
    let mut store = AnnotationStore::default();
    store.create_target_if_absent("maize");
    store.append_point(10, 20).unwrap();
    store.append_point(30, 40).unwrap();
    store.commit_and_start_new("bean");
    store.set_target_box(BoxCorners::new(5, 5)).unwrap();
    store.update_target_box_tail(1, 1).unwrap();
    store
}

#[test]
fn test_encode_decode() {
    let store = make_store();
    let record = encode(&store, "/data/plants/img_01.jpg").unwrap();
    assert_eq!(record.image_name, "img_01.jpg");
    assert_eq!(record.image_path, "/data/plants/img_01.jpg");
    assert_eq!(record.crops.len(), 2);
    assert!(record.crops[0].bbox.is_none());
    let bx = record.crops[1].bbox.as_ref().unwrap();
    assert_eq!((bx.x_min, bx.y_min, bx.x_max, bx.y_max), (1, 1, 5, 5));
    let decoded = decode(record);
    assert_eq!(decoded.target_index(), Some(0));
    assert_eq!(decoded.annotations()[0].points[0].kind, PartKind::Stem);
    assert_eq!(decoded.annotations()[0].points[1].kind, PartKind::Leaf);
    assert_eq!(decoded.annotations()[1].label, "bean");
}

#[test]
fn test_encode_skips_empty_entries() {
    // an empty first entry must not suppress later ones
    let store = AnnotationStore::new(vec![
        PlantAnnotation::new("unknown".to_string()),
        PlantAnnotation {
            label: "bean".to_string(),
            bbox: None,
            points: vec![Point {
                kind: PartKind::Stem,
                x: 3,
                y: 4,
            }],
        },
    ]);
    let record = encode(&store, "a.jpg").unwrap();
    assert_eq!(record.crops.len(), 1);
    assert_eq!(record.crops[0].label, "bean");
}

#[test]
fn test_encode_none_when_all_empty() {
    let store = AnnotationStore::default();
    assert!(encode(&store, "a.jpg").is_none());
    let store = AnnotationStore::new(vec![PlantAnnotation::new("x".to_string())]);
    assert!(encode(&store, "a.jpg").is_none());
}

#[test]
fn test_save_wipes_stale_file() {
    let folder = DEFAULT_TMPDIR.join("test_save_wipes");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    let store = make_store();
    save(&store, "img_02.jpg", &folder).unwrap();
    let anno_path = folder.join("img_02.json");
    assert!(anno_path.exists());
    let empty = AnnotationStore::default();
    save(&empty, "img_02.jpg", &folder).unwrap();
    assert!(!anno_path.exists());
    // removing again when there is no file is fine
    save(&empty, "img_02.jpg", &folder).unwrap();
}

#[test]
fn test_save_load_roundtrip() {
    let folder = DEFAULT_TMPDIR.join("test_record_roundtrip");
    defer_folder_removal!(&folder);
    let store = make_store();
    // the save folder does not exist yet, save must create it
    save(&store, "/somewhere/img_03.png", &folder).unwrap();
    let loaded = load(&folder.join("img_03.json")).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.target_index(), Some(0));
    assert_eq!(loaded.annotations()[0].label, "maize");
    let bx = loaded.annotations()[1].bbox.unwrap();
    assert_eq!((bx.x_min(), bx.y_min(), bx.x_max(), bx.y_max()), (1, 1, 5, 5));
}

#[test]
fn test_decode_missing_box_key_and_kind_order() {
    let json_str = r#"{
        "image_name": "i.jpg",
        "image_path": "i.jpg",
        "crops": [
            {
                "label": "weed",
                "parts": [
                    {"kind": "leaf", "location": {"x": 1, "y": 2}},
                    {"kind": "stem", "location": {"x": 3, "y": 4}}
                ]
            }
        ]
    }"#;
    let record = serde_json::from_str::<AnnotationRecord>(json_str).unwrap();
    let store = decode(record);
    assert!(store.annotations()[0].bbox.is_none());
    let kinds = store.annotations()[0]
        .points
        .iter()
        .map(|p| p.kind)
        .collect::<Vec<_>>();
    // kinds come from the file even if no append sequence could produce them
    assert_eq!(kinds, vec![PartKind::Leaf, PartKind::Stem]);
}

#[test]
fn test_load_absent_and_malformed() {
    let store = load(Path::new("does/not/exist.json")).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.target_index(), None);
    let folder = DEFAULT_TMPDIR.join("test_load_malformed");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    let p = folder.join("bad.json");
    fs::write(&p, "{\"crops\": \"nope\"").unwrap();
    assert!(load(&p).is_err());
    let missing_label = r#"{"image_name": "a", "image_path": "a", "crops": [{"parts": []}]}"#;
    fs::write(&p, missing_label).unwrap();
    assert!(load(&p).is_err());
}
