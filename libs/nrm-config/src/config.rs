use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::params::Params;

/// A loaded `param.json`, plus the directory every relative path in it is
/// resolved against (: "Directory paths are resolved relative to
/// the top directory").
#[derive(Debug, Clone)]
pub struct Config {
    pub params: Params,
    pub top_dir: PathBuf,
}

impl Config {
    /// Load `param.json` from `path`, resolving relative keys against the
    /// file's own parent directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let top_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        Self::load_with_top_dir(path, top_dir)
    }

    pub fn load_with_top_dir(path: &Path, top_dir: PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let params: Params = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        Ok(Config { params, top_dir })
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.top_dir.join(candidate)
        }
    }

    pub fn topo_xml_path(&self) -> PathBuf {
        self.resolve(&self.params.topo_xml)
    }

    pub fn glpk_dir_path(&self) -> PathBuf {
        self.resolve(&self.params.glpk_dir)
    }

    pub fn db_dir_path(&self) -> PathBuf {
        self.resolve(&self.params.db_dir)
    }

    /// `glpk/ac/` — the Available-Connections Builder's output directory.
    pub fn ac_dir_path(&self) -> PathBuf {
        self.glpk_dir_path().join("ac")
    }

    /// `glpk/glpk/` — the Pathfinder Compiler's output directory.
    pub fn pf_dir_path(&self) -> PathBuf {
        self.glpk_dir_path().join("glpk")
    }

    /// `glpk/tmp/` — per-request solver scratch files.
    pub fn tmp_dir_path(&self) -> PathBuf {
        self.glpk_dir_path().join("tmp")
    }

    pub fn pf_tmp_model_path(&self) -> PathBuf {
        self.glpk_dir_path().join(&self.params.pf_tmp_model)
    }

    pub fn solvec_tmp_model_path(&self) -> PathBuf {
        self.glpk_dir_path().join(&self.params.solvec_tmp_model)
    }

    pub fn reserved_db_path(&self) -> PathBuf {
        self.db_dir_path().join("reserved.json")
    }
}
