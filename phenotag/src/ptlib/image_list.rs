use phenotag_domain::{pterr, PtResult};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// All supported image files directly inside the folder, sorted by name so
/// the navigation order is stable across platforms. Subfolders are not
/// entered.
pub fn list_image_files(folder: &Path) -> PtResult<Vec<PathBuf>> {
    let mut paths = fs::read_dir(folder)
        .map_err(|e| pterr!("could not open folder {:?} due to {}", folder, e))?
        .flatten()
        .map(|de| de.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
use crate::{
    defer_folder_removal,
    file_util::{self, DEFAULT_TMPDIR},
};

#[test]
fn test_list_image_files() {
    let folder = DEFAULT_TMPDIR.join("test_list_image_files");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    for name in ["b.JPG", "a.png", "c.jpeg", "notes.txt", "d.tiff"] {
        file_util::write(folder.join(name), "").unwrap();
    }
    // a folder with an image-like name does not count
    fs::create_dir_all(folder.join("sub.png")).unwrap();
    let files = list_image_files(&folder).unwrap();
    let names = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["a.png", "b.JPG", "c.jpeg"]);
    assert!(list_image_files(Path::new("surely-not-here")).is_err());
}
