//! Run configuration.
//!
//! `main` collects raw [`Settings`] from the command line and resolves them once
//! into a [`Config`]: every path absolute, the hash mode settled, rule files
//! discovered. The campaign only ever reads it.
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

use crate::catalog::{BEST64_RULE, rule_files};
use crate::hashtype::{HashTypeError, NTLM_MODE, resolve_mode};

pub const DEFAULT_HISTORICAL_DICT: &str = "pownMyHash.dico";
pub const DEFAULT_STATS_FILE: &str = "dict-stats.json";
pub const DEFAULT_DICTS_DIR: &str = "dico";
pub const POTFILE_NAME: &str = "hashcat.potfile";
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("hash file not readable {path}: {source}")]
    HashFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    HashType(#[from] HashTypeError),
    #[error("cannot determine working directory: {0}")]
    WorkingDir(std::io::Error),
}

/// Raw values as given on the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub hash_file: PathBuf,
    pub hash_type: String,
    pub hashcat_bin: PathBuf,
    pub potfile: Option<PathBuf>,
    pub rules_dir: Option<PathBuf>,
    pub dicts_dir: PathBuf,
    pub historical_dict: PathBuf,
    pub stats_file: PathBuf,
    pub max_rounds: usize,
    pub prompt_timeout: Duration,
    pub mmap_threshold: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub hashcat_bin: PathBuf,
    pub hashcat_dir: PathBuf,
    pub potfile: PathBuf,
    pub hash_file: PathBuf,
    pub hash_mode: String,
    pub rules_dir: PathBuf,
    pub rules: Vec<PathBuf>,
    pub dicts_dir: PathBuf,
    pub historical_dict: PathBuf,
    pub custom_dict: PathBuf,
    pub stats_file: PathBuf,
    pub max_rounds: usize,
    pub prompt_timeout: Duration,
    pub mmap_threshold: u64,
}

impl Config {
    pub fn resolve(settings: Settings) -> Result<Config, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| cwd.clone());
        Self::resolve_from(settings, &cwd, &exe_dir, Path::new("/opt"))
    }

    /// [`Config::resolve`] with explicit lookup roots.
    pub fn resolve_from(
        settings: Settings,
        cwd: &Path,
        exe_dir: &Path,
        opt_root: &Path,
    ) -> Result<Config, ConfigError> {
        let hash_file = absolutize(&settings.hash_file, cwd);
        std::fs::File::open(&hash_file).map_err(|source| ConfigError::HashFile {
            path: hash_file.display().to_string(),
            source,
        })?;
        info!("hash file: {}", hash_file.display());
        let hash_mode = resolve_mode(&settings.hash_type, &hash_file)?;

        let mut custom = hash_file.clone().into_os_string();
        custom.push(".dict");
        let custom_dict = PathBuf::from(custom);
        info!("custom dictionary: {}", custom_dict.display());

        let hashcat_bin = absolutize(&settings.hashcat_bin, cwd);
        let hashcat_dir = hashcat_bin
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        let potfile = settings
            .potfile
            .map(|p| absolutize(&p, cwd))
            .unwrap_or_else(|| hashcat_dir.join(POTFILE_NAME));

        let rules_dir = settings
            .rules_dir
            .map(|p| absolutize(&p, cwd))
            .unwrap_or_else(|| hashcat_dir.join("rules"));
        info!("rules directory: {}", rules_dir.display());
        let rules = match rule_files(&rules_dir) {
            Ok(r) => r,
            Err(e) => {
                warn!("cannot list rules in {}: {}", rules_dir.display(), e);
                Vec::new()
            }
        };
        info!("{} rule files available", rules.len());

        let historical_dict = resolve_data_path(&settings.historical_dict, cwd, exe_dir);
        report_presence("historical dictionary", &historical_dict);
        let stats_file = resolve_data_path(&settings.stats_file, cwd, exe_dir);
        report_presence("dictionary stats", &stats_file);
        let dicts_dir = resolve_dicts_dir(&settings.dicts_dir, cwd, exe_dir, opt_root);
        report_presence("dictionaries directory", &dicts_dir);

        Ok(Config {
            hashcat_bin,
            hashcat_dir,
            potfile,
            hash_file,
            hash_mode,
            rules_dir,
            rules,
            dicts_dir,
            historical_dict,
            custom_dict,
            stats_file,
            max_rounds: settings.max_rounds.max(1),
            prompt_timeout: settings.prompt_timeout,
            mmap_threshold: settings.mmap_threshold,
        })
    }

    /// NTLM dumps carry LM halves worth attacking first.
    pub fn lm_available(&self) -> bool {
        self.hash_mode == NTLM_MODE
    }

    pub fn best64_rule(&self) -> PathBuf {
        self.rules_dir.join(BEST64_RULE)
    }
}

fn absolutize(p: &Path, cwd: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        cwd.join(p)
    }
}

fn report_presence(what: &str, p: &Path) {
    if p.exists() {
        info!("{} found: {}", what, p.display());
    } else {
        warn!("{} not found: {}", what, p.display());
    }
}

/// Relative data files live in the working directory when present there,
/// otherwise next to the executable.
pub fn resolve_data_path(p: &Path, cwd: &Path, exe_dir: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    let local = cwd.join(p);
    if local.exists() {
        local
    } else {
        exe_dir.join(p)
    }
}

/// Like [`resolve_data_path`], but a shared install under `/opt` wins.
pub fn resolve_dicts_dir(p: &Path, cwd: &Path, exe_dir: &Path, opt_root: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    let shared = opt_root.join(p);
    if shared.exists() {
        return shared;
    }
    resolve_data_path(p, cwd, exe_dir)
}
