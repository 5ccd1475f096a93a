use lazy_static::lazy_static;
use phenotag_domain::{pterr, PtResult};
use std::{
    ffi::OsStr,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{error, info};

lazy_static! {
    pub static ref DEFAULT_TMPDIR: PathBuf = std::env::temp_dir().join("phenotag");
}
lazy_static! {
    pub static ref DEFAULT_HOMEDIR: PathBuf = match dirs::home_dir() {
        Some(p) => p.join(".phenotag"),
        _ => std::env::temp_dir().join("phenotag"),
    };
}

pub fn read_to_string<P>(p: P) -> PtResult<String>
where
    P: AsRef<Path> + Debug,
{
    fs::read_to_string(&p).map_err(|e| pterr!("could not read {:?} due to {:?}", p, e))
}

pub fn path_to_str(p: &Path) -> PtResult<&str> {
    osstr_to_str(Some(p.as_os_str()))
        .map_err(|e| pterr!("path_to_str could not transform '{:?}' due to '{:?}'", p, e))
}

pub fn osstr_to_str(p: Option<&OsStr>) -> io::Result<&str> {
    p.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{p:?} not found")))?
        .to_str()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{p:?} not convertible to unicode"),
            )
        })
}

pub struct Defer<F: FnMut()> {
    pub func: F,
}
impl<F: FnMut()> Drop for Defer<F> {
    fn drop(&mut self) {
        (self.func)();
    }
}
#[macro_export]
macro_rules! defer {
    ($f:expr) => {
        let _dfr = $crate::file_util::Defer { func: $f };
    };
}
pub fn checked_remove<'a, P: AsRef<Path> + Debug>(
    path: &'a P,
    func: fn(p: &'a P) -> io::Result<()>,
) {
    match func(path) {
        Ok(_) => info!("removed {path:?}"),
        Err(e) => error!("could not remove {path:?} due to {e:?}"),
    }
}
#[macro_export]
macro_rules! defer_folder_removal {
    ($path:expr) => {
        let func = || $crate::file_util::checked_remove($path, std::fs::remove_dir_all);
        $crate::defer!(func);
    };
}
#[macro_export]
macro_rules! defer_file_removal {
    ($path:expr) => {
        let func = || $crate::file_util::checked_remove($path, std::fs::remove_file);
        $crate::defer!(func);
    };
}

/// All files with the given extension in a folder, sorted by path for
/// deterministic processing order.
pub fn files_in_folder(folder: &Path, extension: &str) -> PtResult<Vec<PathBuf>> {
    let mut files = fs::read_dir(folder)
        .map_err(|e| pterr!("could not open folder {:?} due to {}", folder, e))?
        .flatten()
        .map(|de| de.path())
        .filter(|p| p.is_file() && p.extension() == Some(OsStr::new(extension)))
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

pub fn write<P, C>(path: P, contents: C) -> PtResult<()>
where
    P: AsRef<Path> + Debug,
    C: AsRef<[u8]>,
{
    fs::write(&path, contents).map_err(|e| pterr!("could not write to {:?} since {:?}", path, e))
}

#[test]
fn test_files_in_folder() {
    let folder = DEFAULT_TMPDIR.join("test_files_in_folder");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    for name in ["b.xml", "a.xml", "c.txt", "noext"] {
        write(folder.join(name), "x").unwrap();
    }
    let files = files_in_folder(&folder, "xml").unwrap();
    assert_eq!(files, vec![folder.join("a.xml"), folder.join("b.xml")]);
    assert!(files_in_folder(Path::new("surely-not-existing"), "xml").is_err());
}

#[test]
fn test_osstr() {
    assert!(osstr_to_str(None).is_err());
    assert_eq!(
        osstr_to_str(Path::new("a/b/c.png").file_name()).unwrap(),
        "c.png"
    );
}
