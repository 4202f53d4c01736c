//! Hash-type resolution: turn `--type` into a hashcat mode number, detecting
//! it from the first hash in the file when asked for `auto`.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use log::info;
use regex::Regex;

/// Mode of the NTLM dumps that also carry LM halves.
pub const NTLM_MODE: &str = "1000";
/// Mode used by the LM pre-phase.
pub const LM_MODE: &str = "3000";

#[derive(Debug, thiserror::Error)]
pub enum HashTypeError {
    #[error("cannot read hash file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("hash file {0} is empty")]
    Empty(String),
    #[error("unable to detect hash type from {0:?}")]
    Undetected(String),
    #[error("invalid hash type: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPattern {
    pub name: &'static str,
    pub mode: &'static str,
    pub regex: &'static str,
    pub description: &'static str,
}

/// Checked in order; the first match wins, so the more specific NetNTLMv2
/// pattern sits before NetNTLM and the salted formats before bare hex digests.
pub const PATTERNS: &[HashPattern] = &[
    HashPattern {
        name: "ntlm",
        mode: "1000",
        regex: r"^[^:]+:[0-9]+:[a-fA-F0-9]{32}:[a-fA-F0-9]{32}:::$",
        description: "NTLM (SAM format)",
    },
    HashPattern {
        name: "net-ntlmv2",
        mode: "5600",
        regex: r"^[a-zA-Z0-9]{1,32}:[a-fA-F0-9]{32}:[a-fA-F0-9]{128,}$",
        description: "NetNTLMv2",
    },
    HashPattern {
        name: "net-ntlm",
        mode: "5500",
        regex: r"^[a-zA-Z0-9]{1,32}:[a-fA-F0-9]{32}:[a-fA-F0-9]{48,}$",
        description: "NetNTLM",
    },
    HashPattern {
        name: "krb5tgs$23",
        mode: "13100",
        regex: r"^\$krb5tgs\$23\$",
        description: "Kerberos 5 TGS-REP",
    },
    HashPattern {
        name: "dcc2",
        mode: "2100",
        regex: r"^\$DCC2\$[0-9]+#[^#]+#[a-fA-F0-9]{32}$",
        description: "MS Cache v2",
    },
    HashPattern {
        name: "md5",
        mode: "0",
        regex: r"^[a-fA-F0-9]{32}$",
        description: "MD5",
    },
    HashPattern {
        name: "sha1",
        mode: "100",
        regex: r"^[a-fA-F0-9]{40}$",
        description: "SHA1",
    },
    HashPattern {
        name: "sha256",
        mode: "1400",
        regex: r"^[a-fA-F0-9]{64}$",
        description: "SHA2-256",
    },
    HashPattern {
        name: "sha512",
        mode: "1700",
        regex: r"^[a-fA-F0-9]{128}$",
        description: "SHA2-512",
    },
    HashPattern {
        name: "mysql-sha1",
        mode: "300",
        regex: r"^\*[a-fA-F0-9]{40}$",
        description: "MySQL4.1/MySQL5 SHA1",
    },
];

const ALIASES: &[(&str, &str)] = &[
    ("ntlm", "1000"),
    ("net-ntlm", "5500"),
    ("netntlm", "5500"),
    ("net-ntlmv2", "5600"),
    ("netntlmv2", "5600"),
    ("krb5tgs$23", "13100"),
    ("dcc2", "2100"),
];

/// [`PATTERNS`] compiled once, in table order.
static COMPILED: LazyLock<Vec<(&'static HashPattern, Regex)>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p.regex).ok().map(|re| (p, re)))
        .collect()
});

pub fn detect(sample: &str) -> Option<&'static HashPattern> {
    let sample = sample.trim();
    COMPILED
        .iter()
        .find(|(_, re)| re.is_match(sample))
        .map(|(p, _)| *p)
}

pub fn detect_file(path: &Path) -> Result<&'static HashPattern, HashTypeError> {
    let read_err = |source| HashTypeError::Read {
        path: path.display().to_string(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).map_err(read_err)?;
    let first = first.trim();
    if first.is_empty() {
        return Err(HashTypeError::Empty(path.display().to_string()));
    }
    detect(first).ok_or_else(|| HashTypeError::Undetected(first.to_string()))
}

/// Resolve `requested` (`auto`, an alias, or a numeric mode) to a hashcat mode.
pub fn resolve_mode(requested: &str, hash_file: &Path) -> Result<String, HashTypeError> {
    let requested = requested.trim();
    if requested.is_empty() || requested.eq_ignore_ascii_case("auto") {
        let pattern = detect_file(hash_file)?;
        info!(
            "detected hash type: {} ({}), mode {}",
            pattern.description, pattern.name, pattern.mode
        );
        return Ok(pattern.mode.to_string());
    }
    let lower = requested.to_lowercase();
    if let Some((_, mode)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
        info!("using hash type {} (mode {})", requested, mode);
        return Ok(mode.to_string());
    }
    if requested.parse::<u32>().is_ok() {
        info!("using hash mode {}", requested);
        return Ok(requested.to_string());
    }
    Err(HashTypeError::Invalid(requested.to_string()))
}
