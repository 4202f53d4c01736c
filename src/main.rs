//! CLI entrypoint for `pownmyhash`.
//!
//! Parses command-line arguments, locates hashcat, resolves the run
//! configuration, drives the cracking campaign in the chosen phase order, prints
//! a terminal summary, and optionally writes the dictionary ranking as CSV.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{LevelFilter, error, info, warn};
use pownmyhash::{
    campaign::{Campaign, Phase, parse_order},
    config::{
        Config, DEFAULT_DICTS_DIR, DEFAULT_HISTORICAL_DICT, DEFAULT_STATS_FILE, Settings,
        resolve_data_path, resolve_dicts_dir,
    },
    engine::{Hashcat, locate_hashcat},
    export::save_ranking_csv,
    feedback::DEFAULT_MAX_ROUNDS,
    io::DEFAULT_MMAP_THRESHOLD_BYTES,
    prompt::{AssumeYes, Operator, TimedPrompt},
    ranking::DictRanking,
    report::{render_order, render_ranking, render_summary},
    stats::CampaignStats,
};

#[derive(Parser, Debug)]
#[command(
    name = "pownmyhash",
    version,
    about = "Password recovery campaigns on top of hashcat"
)]
struct Args {
    /// Path to the file of hashes to crack
    #[arg(short = 'f', long = "hashes", required_unless_present = "show_ranking")]
    hashes: Option<PathBuf>,

    /// Hashcat mode, alias (ntlm, netntlmv2, ...) or "auto" to detect
    #[arg(short = 'm', long = "type", default_value = "auto")]
    hash_type: String,

    /// Path to the hashcat binary (searched when omitted)
    #[arg(long = "hashcat")]
    hashcat: Option<PathBuf>,

    /// Path to the potfile (defaults to hashcat.potfile next to hashcat)
    #[arg(long = "potfile")]
    potfile: Option<PathBuf>,

    /// Directory of .rule files (defaults to hashcat's rules directory)
    #[arg(long = "rules")]
    rules: Option<PathBuf>,

    /// Directory of .dico dictionaries
    #[arg(long = "dicts", default_value = DEFAULT_DICTS_DIR)]
    dicts: PathBuf,

    /// Historical corpus of every password recovered so far
    #[arg(long = "historical", default_value = DEFAULT_HISTORICAL_DICT)]
    historical: PathBuf,

    /// Dictionary ranking statistics (JSON)
    #[arg(long = "dict-stats", default_value = DEFAULT_STATS_FILE)]
    dict_stats: PathBuf,

    /// Comma-separated phase order, skipping the interactive menu
    #[arg(long = "order")]
    order: Option<String>,

    /// Accept every phase without asking
    #[arg(short = 'y', long = "yes")]
    yes: bool,

    /// Upper bound on feedback-loop rounds per sweep
    #[arg(long = "max-rounds", default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: usize,

    /// Seconds to wait for an answer before assuming yes
    #[arg(long = "timeout", default_value_t = 5)]
    timeout: u64,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Write the dictionary ranking to this CSV file after the run
    #[arg(long = "export-ranking")]
    export_ranking: Option<PathBuf>,

    /// Print the dictionary ranking and exit
    #[arg(long = "show-ranking")]
    show_ranking: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress summary output and informational logging
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

const ASCII_TITLE: &str = r#"
                                               _   _           _
  _ __   _____      ___ __  _ __ ___  _   _| | | | __ _ ___| |__
 | '_ \ / _ \ \ /\ / / '_ \| '_ ` _ \| | | | |_| |/ _` / __| '_ \
 | |_) | (_) \ V  V /| | | | | | | | | |_| |  _  | (_| \__ \ | | |
 | .__/ \___/ \_/\_/ |_| |_|_| |_| |_|\__, |_| |_|\__,_|___/_| |_|
 |_|                                  |___/
"#;

fn init_logger(verbosity: u8, quiet: bool) {
    let level = match (quiet, verbosity) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn verify_inputs(args: &Args) -> Result<()> {
    if let Some(p) = &args.hashes {
        if !p.is_file() {
            bail!("hash file not found: {}", p.display());
        }
    }
    if let Some(p) = &args.rules {
        if !p.is_dir() {
            warn!("rules directory not found: {} (continuing)", p.display());
        }
    }
    if args.timeout == 0 {
        bail!("--timeout must be at least 1 second");
    }
    Ok(())
}

fn cwd_and_exe_dir() -> (PathBuf, PathBuf) {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| cwd.clone());
    (cwd, exe_dir)
}

fn show_ranking(args: &Args) {
    let (cwd, exe_dir) = cwd_and_exe_dir();
    let stats = resolve_data_path(&args.dict_stats, &cwd, &exe_dir);
    let dicts = resolve_dicts_dir(&args.dicts, &cwd, &exe_dir, Path::new("/opt"));
    let ranking = DictRanking::load(stats, dicts);
    println!("{}", render_ranking(&ranking));
    export_or_exit(args, &ranking);
}

fn export_or_exit(args: &Args, ranking: &DictRanking) {
    if let Some(out) = &args.export_ranking {
        if let Err(e) = save_ranking_csv(ranking, out) {
            error!("failed to export ranking to {}: {:#}", out.display(), e);
            std::process::exit(5);
        }
        info!("ranking exported to {}", out.display());
    }
}

/// Run the campaign with a concrete operator and hand back what the summary
/// needs.
fn drive<O: Operator>(
    cfg: &Config,
    operator: O,
    order: Option<Vec<Phase>>,
) -> (CampaignStats, DictRanking) {
    let mut campaign = Campaign::new(cfg, Hashcat::from_config(cfg), operator);
    let order = order.unwrap_or_else(|| campaign.choose_order());
    info!("running phases: {}", render_order(&order));
    let stats = campaign.run(&order).clone();
    (stats, campaign.ranking().clone())
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose, args.quiet);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    if let Err(e) = verify_inputs(&args) {
        error!("{}", e);
        std::process::exit(2);
    }
    if args.show_ranking {
        show_ranking(&args);
        return;
    }
    let Some(hashes) = args.hashes.clone() else {
        error!("no hash file provided (--hashes)");
        std::process::exit(2);
    };

    let hashcat_bin = match locate_hashcat(args.hashcat.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            error!("{}", e);
            std::process::exit(3);
        }
    };
    info!("hashcat binary: {}", hashcat_bin.display());

    let settings = Settings {
        hash_file: hashes,
        hash_type: args.hash_type.clone(),
        hashcat_bin,
        potfile: args.potfile.clone(),
        rules_dir: args.rules.clone(),
        dicts_dir: args.dicts.clone(),
        historical_dict: args.historical.clone(),
        stats_file: args.dict_stats.clone(),
        max_rounds: args.max_rounds,
        prompt_timeout: Duration::from_secs(args.timeout),
        mmap_threshold: if args.mmap_threshold == 0 {
            u64::MAX
        } else {
            args.mmap_threshold
        },
    };
    let cfg = match Config::resolve(settings) {
        Ok(c) => c,
        Err(e @ pownmyhash::config::ConfigError::HashType(_)) => {
            error!("{}", e);
            std::process::exit(4);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    let order = match &args.order {
        Some(raw) => {
            let parsed = parse_order(raw, cfg.lm_available());
            for bad in &parsed.rejected {
                warn!("ignoring unknown or unavailable phase {:?}", bad);
            }
            if parsed.phases.is_empty() {
                error!("no runnable phase in --order {:?}", raw);
                std::process::exit(2);
            }
            Some(parsed.phases)
        }
        None => None,
    };

    if !args.quiet {
        println!("{}", ASCII_TITLE.bold().green());
    }

    let (stats, ranking) = if args.yes {
        drive(&cfg, AssumeYes, order)
    } else {
        match TimedPrompt::spawn(cfg.prompt_timeout) {
            Ok(prompt) => drive(&cfg, prompt, order),
            Err(e) => {
                warn!("cannot read answers from stdin ({}), assuming yes", e);
                drive(&cfg, AssumeYes, order)
            }
        }
    };

    if !args.quiet {
        println!("{}", render_summary(&stats, &ranking));
    }
    export_or_exit(&args, &ranking);
}
