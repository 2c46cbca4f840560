//! JSON file backed [`MapRepository`]

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use log::info;

use super::{MapData, MapRepoError, MapRepository};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Reads maps from `<maps_dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonMapRepository {
    maps_dir: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JsonMapRepository {
    pub fn new<P: AsRef<Path>>(maps_dir: P) -> Self {
        Self {
            maps_dir: maps_dir.as_ref().to_path_buf(),
        }
    }

    /// Repository over `<sw_root>/params/maps`.
    pub fn from_params_dir() -> Result<Self, util::params::LoadError> {
        Ok(Self::new(util::params::params_dir()?.join("maps")))
    }

    pub fn maps_dir(&self) -> &Path {
        &self.maps_dir
    }

    fn map_path(&self, name: &str) -> Result<PathBuf, MapRepoError> {
        let has_separator = name.contains(|c: char| c == '/' || c == '\\');
        if name.is_empty() || has_separator || name.contains("..") {
            return Err(MapRepoError::InvalidName(name.to_string()));
        }

        Ok(self.maps_dir.join(format!("{}.json", name)))
    }
}

impl MapRepository for JsonMapRepository {
    fn load_map(&self, name: &str) -> Result<MapData, MapRepoError> {
        let path = self.map_path(name)?;
        let s = read_to_string(&path).map_err(|e| MapRepoError::Read(path.clone(), e))?;

        let map = MapData::from_json_str(&s)?;

        info!(
            "Loaded map \"{}\": {} forbidden areas, {} points of interest",
            name,
            map.forbidden_areas.len(),
            map.points_of_interest.len()
        );

        Ok(map)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_map() {
        let dir = std::env::temp_dir().join(format!("nav_exec_maps_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("lounge.json"),
            r#"{"forbidden_areas": [[[1.0, 1.0], [2.0, 1.0], [2.0, 2.0]]],
                "points_of_interest": {"t1": [3.0, 4.0]}}"#,
        )
        .unwrap();

        let repo = JsonMapRepository::new(&dir);
        let map = repo.load_map("lounge").unwrap();
        assert_eq!(map.forbidden_areas.len(), 1);
        assert_eq!(map.poi("t1").unwrap().kind, "table");

        assert!(matches!(repo.load_map("missing"), Err(MapRepoError::Read(_, _))));
        assert!(matches!(
            repo.load_map("../lounge"),
            Err(MapRepoError::InvalidName(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
