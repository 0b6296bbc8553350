use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use simdex::{
    CompressionCodec, Corpus, ExternalMatch, LoggingYamlConfig, PairReport, SimdexConfig,
    compare_files,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Winnowing fingerprints and similarity search over source files.
#[derive(Parser, Debug)]
#[command(name = "simdex", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "SIMDEX_CONFIG")]
    config: Option<PathBuf>,

    /// k-gram window length (overrides the config file)
    #[arg(short, global = true)]
    k: Option<usize>,

    /// Winnowing window width (overrides the config file)
    #[arg(short, global = true)]
    w: Option<usize>,

    /// tracing filter directive; RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Write snapshots zstd-compressed
    #[arg(long, global = true)]
    compress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two files directly
    Compare { left: PathBuf, right: PathBuf },

    /// Build or extend a snapshot from NAME=PATH entries
    Index {
        /// Snapshot file to write
        #[arg(long)]
        out: PathBuf,

        /// Load the existing snapshot first and add to it
        #[arg(long)]
        append: bool,

        /// Documents as NAME=PATH, or a bare PATH named after itself.
        /// Repeating a NAME merges those files into one document.
        #[arg(required = true)]
        documents: Vec<String>,
    },

    /// Match an unregistered file against every document in a snapshot
    Match {
        #[arg(long)]
        index: PathBuf,
        file: PathBuf,
    },

    /// Compare two documents registered in a snapshot
    Pair {
        #[arg(long)]
        index: PathBuf,
        left: String,
        right: String,
    },

    /// Print the token codes of a file as JSON
    Tokenize { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging);

    match &cli.command {
        Command::Compare { left, right } => {
            let report = compare_files(left, right, &config)?;
            print_pair(&report);
        }
        Command::Index {
            out,
            append,
            documents,
        } => build_index(&config, out, *append, documents)?,
        Command::Match { index, file } => {
            let corpus = Corpus::load(index, config.build_tokenizer())?;
            let source = read(file)?;
            let mut matches = corpus.match_source(&source)?;
            matches.sort_by(|a, b| b.covered.cmp(&a.covered));
            print_matches(&matches);
        }
        Command::Pair { index, left, right } => {
            let corpus = Corpus::load(index, config.build_tokenizer())?;
            print_pair(&corpus.pair(left, right)?);
        }
        Command::Tokenize { file } => {
            let corpus = Corpus::new(&config)?;
            let tokens = corpus.tokenize(&read(file)?)?;
            println!("{}", serde_json::to_string(&tokens)?);
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<SimdexConfig> {
    let mut config = match &cli.config {
        Some(path) => SimdexConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimdexConfig::default(),
    };
    if let Some(k) = cli.k {
        config.fingerprint.k = k;
    }
    if let Some(w) = cli.w {
        config.fingerprint.w = w;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.log_json {
        config.logging.json = true;
    }
    if cli.compress {
        config.snapshot.compression = CompressionCodec::Zstd;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(cfg: &LoggingYamlConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cfg.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_index(config: &SimdexConfig, out: &Path, append: bool, documents: &[String]) -> Result<()> {
    let corpus = if append && out.exists() {
        let corpus = Corpus::load(out, config.build_tokenizer())?;
        let loaded = corpus.config();
        if loaded != config.fingerprint_config() {
            warn!(
                k = loaded.k,
                w = loaded.w,
                "appending with the snapshot's window parameters"
            );
        }
        corpus
    } else {
        Corpus::new(config)?
    };

    let mut batch = Vec::with_capacity(documents.len());
    for entry in documents {
        let (name, path) = match entry.split_once('=') {
            Some((name, path)) => (name.to_owned(), PathBuf::from(path)),
            None => (entry.clone(), PathBuf::from(entry)),
        };
        if name.is_empty() {
            bail!("empty document name in {entry:?}");
        }
        batch.push((name, read(&path)?));
    }

    corpus.add_sources(&batch)?;
    corpus.save(out, &config.compression())?;
    info!(
        documents = corpus.len(),
        path = %out.display(),
        "index ready"
    );
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn print_pair(report: &PairReport) {
    println!("{} <-> {}", report.left, report.right);
    println!(
        "  shared fingerprints: {} ({} / {})",
        report.covered, report.left_total, report.right_total
    );
    println!("  overlap: {:.1}%", report.overlap() * 100.0);
    println!("  jaccard: {:.1}%", report.jaccard() * 100.0);
}

fn print_matches(matches: &[ExternalMatch]) {
    println!("{:<40} {:>8} {:>8} {:>8} {:>9}", "document", "covered", "source", "total", "coverage");
    for m in matches {
        println!(
            "{:<40} {:>8} {:>8} {:>8} {:>8.1}%",
            m.document,
            m.covered,
            m.external_total,
            m.document_total,
            m.document_coverage() * 100.0
        );
    }
}
