use crate::file_util::{self, DEFAULT_HOMEDIR};
use phenotag_domain::{pterr, PtResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CFG_TOML: &str = r#"
    image_cache_capacity = 8
    # home_folder =
    # save_dir =
    "#;

fn get_default_cache_capacity() -> usize {
    8
}

pub fn get_cfg_path() -> PathBuf {
    DEFAULT_HOMEDIR.join("phenotag_cfg.toml")
}

pub fn get_log_folder() -> PathBuf {
    DEFAULT_HOMEDIR.join("logs")
}

fn read_cfg_from_path(cfg_toml_path: &Path) -> PtResult<Cfg> {
    if cfg_toml_path.exists() {
        let toml_str = file_util::read_to_string(cfg_toml_path)?;
        toml::from_str(&toml_str).map_err(|e| pterr!("could not parse cfg due to {:?}", e))
    } else {
        info!("no cfg file found. using default cfg");
        Ok(Cfg::default())
    }
}

pub fn get_cfg() -> PtResult<Cfg> {
    read_cfg_from_path(&get_cfg_path())
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Cfg {
    home_folder: Option<String>,
    #[serde(default = "get_default_cache_capacity")]
    pub image_cache_capacity: usize,
    save_dir: Option<String>,
}
impl Default for Cfg {
    fn default() -> Self {
        toml::from_str(DEFAULT_CFG_TOML).unwrap_or(Cfg {
            home_folder: None,
            image_cache_capacity: get_default_cache_capacity(),
            save_dir: None,
        })
    }
}
impl Cfg {
    pub fn home_folder(&self) -> PtResult<&str> {
        match self.home_folder.as_deref() {
            None => DEFAULT_HOMEDIR
                .to_str()
                .ok_or_else(|| pterr!("could not get homedir")),
            Some(hf) => Ok(hf),
        }
    }
    pub fn save_dir(&self) -> Option<&Path> {
        self.save_dir.as_deref().map(Path::new)
    }
}

#[cfg(test)]
use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};
#[cfg(test)]
use std::fs;

#[test]
fn test_toml() -> PtResult<()> {
    let cfg: Cfg = get_cfg()?;
    println!("{cfg:?}");
    assert_eq!(Cfg::default().image_cache_capacity, 8);
    Ok(())
}
#[test]
fn test_default_cfg_paths() {
    DEFAULT_HOMEDIR.to_str().unwrap();
    DEFAULT_TMPDIR.to_str().unwrap();
}

#[test]
fn test_read_cfg_file() {
    let folder = DEFAULT_TMPDIR.join("test_read_cfg_file");
    fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    let cfg_path = folder.join("phenotag_cfg.toml");
    file_util::write(&cfg_path, "home_folder = \"/somewhere\"\nsave_dir = \"annos\"").unwrap();
    let cfg = read_cfg_from_path(&cfg_path).unwrap();
    assert_eq!(cfg.home_folder().unwrap(), "/somewhere");
    assert_eq!(cfg.save_dir(), Some(Path::new("annos")));
    assert_eq!(cfg.image_cache_capacity, 8);
    file_util::write(&cfg_path, "image_cache_capacity = \"nope\"").unwrap();
    assert!(read_cfg_from_path(&cfg_path).is_err());
}
