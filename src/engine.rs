//! Engine: the seam between the campaign and hashcat.
//!
//! The campaign only ever talks to a [`CrackEngine`]. [`Hashcat`] is the real
//! implementation; it runs one blocking process per [`Invocation`], each under
//! its own random session name that is cleaned up afterwards, and lists
//! recovered plaintexts with `--show`.
//!
//! Invocations are strictly sequential: hashcat's session state and the shared
//! potfile do not tolerate concurrent writers.
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::config::Config;
use crate::credential::Plaintext;
use crate::pot::parse_show_output;

/// hashcat exits with 1 when the keyspace is exhausted without recovering
/// every hash. That is a completed pass, not a failure.
pub const EXHAUSTED_EXIT_CODE: i32 = 1;

const SESSION_PREFIX: &str = "pownmyhash_";

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("hashcat executable not found: {0}")]
    NotFound(String),
    #[error("failed to start {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("hashcat exited with {status} (phase: {phase})")]
    Failed { status: String, phase: String },
}

/// What hashcat should try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attack {
    /// `-a 3`. Without a mask hashcat falls back to its built-in default mask.
    Mask {
        mask: Option<String>,
        increment: Option<(u8, u8)>,
    },
    /// `-a 0` with zero or more stacked rule files.
    Wordlist {
        dictionary: PathBuf,
        rules: Vec<PathBuf>,
        loopback: bool,
    },
}

impl Attack {
    pub fn mask(mask: &str) -> Self {
        Attack::Mask {
            mask: Some(mask.to_string()),
            increment: None,
        }
    }

    pub fn wordlist<P: Into<PathBuf>>(dictionary: P, rule: Option<&Path>) -> Self {
        Attack::Wordlist {
            dictionary: dictionary.into(),
            rules: rule.map(Path::to_path_buf).into_iter().collect(),
            loopback: false,
        }
    }

    /// Arguments following the hash file on the hashcat command line.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            Attack::Mask { mask, increment } => {
                args.push("-a".into());
                args.push("3".into());
                if let Some(m) = mask {
                    args.push(m.into());
                }
                if let Some((min, max)) = increment {
                    args.push("--increment".into());
                    args.push("--increment-min".into());
                    args.push(min.to_string().into());
                    args.push("--increment-max".into());
                    args.push(max.to_string().into());
                }
            }
            Attack::Wordlist {
                dictionary,
                rules,
                loopback,
            } => {
                args.push("-a".into());
                args.push("0".into());
                args.push(dictionary.into());
                for rule in rules {
                    args.push("-r".into());
                    args.push(rule.into());
                }
                if *loopback {
                    args.push("--loopback".into());
                }
            }
        }
        args
    }
}

/// One engine run: hash mode, attack, and the phase label used in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub hash_mode: String,
    pub attack: Attack,
    pub phase: String,
}

impl Invocation {
    pub fn new(hash_mode: &str, attack: Attack, phase: impl Into<String>) -> Self {
        Self {
            hash_mode: hash_mode.to_string(),
            attack,
            phase: phase.into(),
        }
    }
}

pub trait CrackEngine {
    /// Run one attack to completion. Blocks until the process exits.
    fn run(&mut self, invocation: &Invocation) -> Result<(), EngineError>;

    /// Plaintexts currently recovered for the hash file, one per output line.
    fn show(&mut self, hash_mode: &str) -> Result<Vec<Plaintext>, EngineError>;
}

/// Drives a local hashcat binary.
#[derive(Debug, Clone)]
pub struct Hashcat {
    bin: PathBuf,
    dir: PathBuf,
    potfile: PathBuf,
    hash_file: PathBuf,
}

impl Hashcat {
    pub fn new(bin: PathBuf, potfile: PathBuf, hash_file: PathBuf) -> Self {
        let dir = bin
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            bin,
            dir,
            potfile,
            hash_file,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.hashcat_bin.clone(),
            cfg.potfile.clone(),
            cfg.hash_file.clone(),
        )
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        // hashcat resolves its OpenCL kernels and charsets relative to its own
        // directory; every path handed to it is absolute.
        cmd.current_dir(&self.dir);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> EngineError {
        if source.kind() == std::io::ErrorKind::NotFound {
            EngineError::NotFound(self.bin.display().to_string())
        } else {
            EngineError::Spawn {
                bin: self.bin.display().to_string(),
                source,
            }
        }
    }

    pub fn run_args(&self, session: &str, invocation: &Invocation) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            format!("--session={session}").into(),
            "-O".into(),
            "--force".into(),
            "-w".into(),
            "4".into(),
            "--potfile-path".into(),
            self.potfile.clone().into(),
            "-m".into(),
            invocation.hash_mode.clone().into(),
            self.hash_file.clone().into(),
        ];
        args.extend(invocation.attack.to_args());
        args
    }

    pub fn show_args(&self, hash_mode: &str) -> Vec<OsString> {
        vec![
            "--show".into(),
            "--outfile-format=2".into(),
            "--potfile-path".into(),
            self.potfile.clone().into(),
            "-m".into(),
            hash_mode.into(),
            self.hash_file.clone().into(),
        ]
    }
}

impl CrackEngine for Hashcat {
    fn run(&mut self, invocation: &Invocation) -> Result<(), EngineError> {
        let session = session_id();
        let args = self.run_args(&session, invocation);
        info!(
            "running hashcat phase [{}] with {}",
            invocation.phase,
            display_args(&args)
        );
        let status = self
            .command()
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status();
        cleanup_session(&self.dir, &session);
        let status = status.map_err(|e| self.spawn_error(e))?;
        match status.code() {
            Some(0) | Some(EXHAUSTED_EXIT_CODE) => Ok(()),
            _ => Err(EngineError::Failed {
                status: status.to_string(),
                phase: invocation.phase.clone(),
            }),
        }
    }

    fn show(&mut self, hash_mode: &str) -> Result<Vec<Plaintext>, EngineError> {
        let args = self.show_args(hash_mode);
        debug!("running {} {}", self.bin.display(), display_args(&args));
        let output = self
            .command()
            .args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        match output.status.code() {
            Some(0) | Some(EXHAUSTED_EXIT_CODE) => {}
            _ => {
                return Err(EngineError::Failed {
                    status: output.status.to_string(),
                    phase: "show".to_string(),
                });
            }
        }
        Ok(parse_show_output(&output.stdout))
    }
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unique per invocation so unrelated hashcat sessions on the host are never
/// restored or overwritten.
pub fn session_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("{SESSION_PREFIX}{suffix}")
}

/// Remove the restore/log/outfile artifacts hashcat left for `session`, both
/// beside the binary and in its `sessions/` directory.
pub fn cleanup_session(hashcat_dir: &Path, session: &str) {
    for dir in [hashcat_dir.to_path_buf(), hashcat_dir.join("sessions")] {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if !entry.file_name().to_string_lossy().starts_with(session) {
                continue;
            }
            let path = entry.path();
            debug!("removing hashcat session artifact {}", path.display());
            let res = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = res {
                warn!("failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

fn default_locations() -> &'static [&'static str] {
    if cfg!(windows) {
        &["hashcat.exe", "./hashcat/hashcat.exe", "./hashcat.exe"]
    } else {
        &[
            "/opt/hashcat/hashcat.bin",
            "./hashcat/hashcat.bin",
            "./hashcat.bin",
        ]
    }
}

/// Find the hashcat binary: an explicit path must exist, otherwise the usual
/// install locations are tried before `PATH`.
pub fn locate_hashcat(explicit: Option<&Path>) -> Result<PathBuf, EngineError> {
    if let Some(p) = explicit {
        if p.is_file() {
            return std::path::absolute(p)
                .map_err(|e| EngineError::NotFound(format!("{}: {}", p.display(), e)));
        }
        return Err(EngineError::NotFound(p.display().to_string()));
    }
    for candidate in default_locations() {
        let p = Path::new(candidate);
        if p.is_file() {
            match std::path::absolute(p) {
                Ok(abs) => return Ok(abs),
                Err(e) => warn!("cannot make {} absolute: {}", p.display(), e),
            }
        }
    }
    let name = if cfg!(windows) {
        "hashcat.exe"
    } else {
        "hashcat"
    };
    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let p = dir.join(name);
            if p.is_file() {
                return Ok(p);
            }
        }
    }
    Err(EngineError::NotFound(format!(
        "searched {} and PATH",
        default_locations().join(", ")
    )))
}
