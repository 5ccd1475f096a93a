use crate::file_util::{files_in_folder, osstr_to_str};
use crate::record_io::{AnnotationRecord, CropRecord, FormatError, LocationRecord, PartRecord};
use phenotag_domain::{pterr, to_pt, PartKind, PtResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

#[derive(Deserialize, Debug)]
struct VocBndbox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

#[derive(Deserialize, Debug)]
struct VocObject {
    name: String,
    bndbox: VocBndbox,
}

#[derive(Deserialize, Debug)]
struct VocAnnotation {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(rename = "object", default)]
    objects: Vec<VocObject>,
}

fn is_stem_object(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("stem") || lower.contains("tige")
}

fn center(lo: f64, hi: f64) -> Result<u32, FormatError> {
    let mid = (lo + hi) / 2.0;
    if mid.is_finite() && mid >= 0.0 {
        Ok(mid as u32)
    } else {
        Err(FormatError::InvalidFormat {
            message: format!("bndbox center {mid} is not a pixel coordinate"),
        })
    }
}

/// Converts one Pascal VOC file. Returns whether a JSON file was written,
/// i.e. whether any object of the XML looked like a stem.
fn convert_voc_file(xml_path: &Path, save_dir: &Path) -> Result<bool, FormatError> {
    let xml = fs::read_to_string(xml_path)?;
    let voc: VocAnnotation =
        quick_xml::de::from_str(&xml).map_err(|e| FormatError::Xml(e.to_string()))?;
    let image_name = voc
        .filename
        .ok_or(FormatError::MissingField { field: "filename" })?;
    let image_path = voc.path.unwrap_or_else(|| image_name.clone());
    let mut crops = Vec::new();
    for obj in &voc.objects {
        if !is_stem_object(&obj.name) {
            continue;
        }
        let x = center(obj.bndbox.xmin, obj.bndbox.xmax)?;
        let y = center(obj.bndbox.ymin, obj.bndbox.ymax)?;
        crops.push(CropRecord {
            label: obj.name.clone(),
            bbox: None,
            parts: vec![PartRecord {
                kind: PartKind::Stem,
                location: LocationRecord { x, y },
            }],
        });
    }
    if crops.is_empty() {
        return Ok(false);
    }
    let record = AnnotationRecord {
        image_name,
        image_path,
        crops,
    };
    let stem = osstr_to_str(xml_path.file_stem())?;
    let out_path = save_dir.join(format!("{stem}.json"));
    fs::write(&out_path, serde_json::to_string_pretty(&record)?)?;
    info!("wrote {out_path:?}");
    Ok(true)
}

/// Converts every `*.xml` in `xml_dir` into an annotation file in
/// `save_dir`. Files that fail do not stop the conversion of the rest but
/// make the overall result an error. Returns the number of files written.
pub fn convert_voc_dir(xml_dir: &Path, save_dir: &Path) -> PtResult<usize> {
    let xml_paths = files_in_folder(xml_dir, "xml")?;
    fs::create_dir_all(save_dir).map_err(to_pt)?;
    let mut n_written = 0;
    let mut n_failed = 0;
    for xml_path in &xml_paths {
        match convert_voc_file(xml_path, save_dir) {
            Ok(true) => n_written += 1,
            Ok(false) => info!("no stem objects in {xml_path:?}"),
            Err(e) => {
                error!("could not convert {xml_path:?} due to {e}");
                n_failed += 1;
            }
        }
    }
    if n_failed > 0 {
        Err(pterr!(
            "{} of {} xml files failed to convert",
            n_failed,
            xml_paths.len()
        ))
    } else {
        Ok(n_written)
    }
}

#[cfg(test)]
use crate::{
    defer_folder_removal, file_util::DEFAULT_TMPDIR, tracing_setup::init_tracing_for_tests,
};

#[cfg(test)]
const VOC_XML: &str = r#"<annotation>
    <folder>plants</folder>
    <filename>a.jpg</filename>
    <path>/data/plants/a.jpg</path>
    <object>
        <name>maize_stem</name>
        <bndbox><xmin>10</xmin><ymin>20</ymin><xmax>15</xmax><ymax>25</ymax></bndbox>
    </object>
    <object>
        <name>leaf_blade</name>
        <bndbox><xmin>1</xmin><ymin>1</ymin><xmax>2</xmax><ymax>2</ymax></bndbox>
    </object>
    <object>
        <name>Tige principale</name>
        <bndbox><xmin>30</xmin><ymin>40</ymin><xmax>31</xmax><ymax>41</ymax></bndbox>
    </object>
</annotation>
"#;

#[test]
fn test_convert_dir() {
    init_tracing_for_tests();
    let folder = DEFAULT_TMPDIR.join("test_voc_convert");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    fs::write(folder.join("a.xml"), VOC_XML).unwrap();
    fs::write(
        folder.join("b.xml"),
        VOC_XML.replace("stem", "flower").replace("Tige", "Bud"),
    )
    .unwrap();
    let n = convert_voc_dir(&folder, &folder).unwrap();
    assert_eq!(n, 1);
    assert!(!folder.join("b.json").exists());
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(folder.join("a.json")).unwrap()).unwrap();
    assert_eq!(json["image_name"], "a.jpg");
    assert_eq!(json["image_path"], "/data/plants/a.jpg");
    let crops = json["crops"].as_array().unwrap();
    assert_eq!(crops.len(), 2);
    assert_eq!(crops[0]["label"], "maize_stem");
    assert_eq!(crops[0]["box"], serde_json::Value::Null);
    assert_eq!(crops[0]["parts"][0]["kind"], "stem");
    assert_eq!(crops[0]["parts"][0]["location"]["x"], 12);
    assert_eq!(crops[0]["parts"][0]["location"]["y"], 22);
    assert_eq!(crops[1]["label"], "Tige principale");
    assert_eq!(crops[1]["parts"][0]["location"]["x"], 30);
}

#[test]
fn test_failed_file_keeps_conversion_going() {
    init_tracing_for_tests();
    let folder = DEFAULT_TMPDIR.join("test_voc_failures");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    fs::write(folder.join("broken.xml"), "<annotation><object>").unwrap();
    fs::write(folder.join("good.xml"), VOC_XML).unwrap();
    assert!(convert_voc_dir(&folder, &folder).is_err());
    assert!(folder.join("good.json").exists());
    assert!(!folder.join("broken.json").exists());
}

#[test]
fn test_filename_is_required() {
    init_tracing_for_tests();
    let folder = DEFAULT_TMPDIR.join("test_voc_filename");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    let xml = VOC_XML.replace("<filename>a.jpg</filename>", "");
    fs::write(folder.join("a.xml"), &xml).unwrap();
    assert!(convert_voc_dir(&folder, &folder).is_err());
}
