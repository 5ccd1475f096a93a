use serde::{Deserialize, Serialize};

/// Role of an annotated point within one plant. Serialized lowercase into the
/// annotation files, hence the rename.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Stem,
    Leaf,
}

/// Point of interest on a plant in pixel coordinates of the image.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub kind: PartKind,
    pub x: u32,
    pub y: u32,
}

#[test]
fn test_kind_wire_names() {
    assert_eq!(serde_json::to_string(&PartKind::Stem).unwrap(), "\"stem\"");
    assert_eq!(serde_json::to_string(&PartKind::Leaf).unwrap(), "\"leaf\"");
    assert_eq!(
        serde_json::from_str::<PartKind>("\"leaf\"").unwrap(),
        PartKind::Leaf
    );
}
