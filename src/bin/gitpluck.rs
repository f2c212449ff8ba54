// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use gitpluck::{
    config::{ColorChoice, Config, Settings},
    execute,
    fetch::{ExtractOptions, FileWrittenHook, OverwritePolicy},
    path::{default_config_path, default_store_dir},
    resolve, DownloadSettings, Git2Fetcher, ListSettings, Mode, Store,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{
    fs::read_to_string,
    io::{ErrorKind, IsTerminal},
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  gitpluck get [options] <[!]owner/repo[/path]>...\n  gitpluck ls [options] <[!]owner/repo[/path]>...",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn shared(&self) -> &SharedOptions {
        match &self.command {
            Command::Get(opts) => &opts.shared,
            Command::Ls(opts) => &opts.shared,
        }
    }

    async fn run(self, settings: Settings) -> Result<()> {
        match self.command {
            Command::Get(opts) => run_get(opts, settings).await,
            Command::Ls(opts) => run_ls(opts, settings).await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Download files from repositories, left to right.
    #[command(override_usage = "gitpluck get [options] <[!]owner/repo[/path]>...")]
    Get(GetOptions),

    /// List files in repositories that path specs match.
    #[command(override_usage = "gitpluck ls [options] <[!]owner/repo[/path]>...")]
    Ls(LsOptions),
}

#[derive(Args, Clone, Debug)]
struct SharedOptions {
    /// Path specs: owner/repo, owner/repo/file, owner/repo/dir/, owner/repo/**/*.glob.
    #[arg(required = true, value_name = "path_spec")]
    pub paths: Vec<String>,

    /// Directory files get written to.
    #[arg(short = 'o', long, value_name = "dir")]
    pub dest: Option<PathBuf>,

    /// Match paths without regard to case.
    #[arg(short, long)]
    pub ignore_case: bool,

    /// When to color output.
    #[arg(long, value_enum, value_name = "when")]
    pub color: Option<ColorChoice>,

    /// Path to configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct GetOptions {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Skip files that already exist.
    #[arg(long, group = "overwrite")]
    pub keep_existing: bool,

    /// Skip files that already exist and are newer than the repository.
    #[arg(long, group = "overwrite")]
    pub keep_newer: bool,

    /// Replace anything in the way, directories included.
    #[arg(short, long, group = "overwrite")]
    pub force: bool,

    /// Drop leading path components from written files.
    #[arg(long, value_name = "count")]
    pub strip: Option<usize>,

    /// Report every file written.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LsOptions {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Only list files that already exist in destination.
    #[arg(long)]
    pub conflicts_only: bool,

    /// Prefix listed paths with owner/repo.
    #[arg(short, long)]
    pub prefix: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.shared().config.as_deref());

    let choice = cli
        .shared()
        .color
        .or_else(|| config.as_ref().ok().map(|config| config.settings.color))
        .unwrap_or_default();
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_ansi(choice.enabled(std::io::stderr().is_terminal()))
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    let result = match config {
        Ok(config) => cli.run(config.settings).await,
        Err(error) => Err(error),
    };

    if let Err(error) = result {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    match read_to_string(&path) {
        Ok(data) => data
            .parse()
            .with_context(|| format!("invalid configuration file {:?}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(err) => {
            Err(err).with_context(|| format!("cannot read configuration file {:?}", path.display()))
        }
    }
}

fn open_fetcher(settings: &Settings) -> Result<Git2Fetcher> {
    let store_dir = match &settings.cache_dir {
        Some(dir) => dir.clone(),
        None => default_store_dir()?,
    };
    let store = Store::open(store_dir)?;

    Ok(Git2Fetcher::new(store, settings.remote.as_str())
        .with_progress(std::io::stderr().is_terminal()))
}

fn destination(shared: &SharedOptions, settings: &Settings) -> PathBuf {
    shared
        .dest
        .clone()
        .or_else(|| settings.dest.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn run_get(opts: GetOptions, settings: Settings) -> Result<()> {
    let case_insensitive = opts.shared.ignore_case || settings.ignore_case;
    let groups = resolve(opts.shared.paths.as_slice(), false, case_insensitive)?;

    let overwrite = if opts.keep_existing {
        OverwritePolicy::KeepExisting
    } else if opts.keep_newer {
        OverwritePolicy::KeepNewer
    } else if opts.force {
        OverwritePolicy::Force
    } else {
        settings.overwrite
    };
    let strip = opts.strip.unwrap_or(settings.strip);
    let on_file_written = opts
        .verbose
        .then(|| FileWrittenHook::new(|path| info!("wrote {}", path.display())));

    let mode = Mode::Download(DownloadSettings {
        dest: destination(&opts.shared, &settings),
        extract: ExtractOptions {
            overwrite,
            strip: (strip > 0).then_some(strip),
        },
        on_file_written,
    });

    let fetcher = open_fetcher(&settings)?;
    let typos = execute(&fetcher, &groups, &mode).await?;
    for typo in typos {
        warn!(
            "{:?} matched nothing, did you mean {:?}?",
            typo.original, typo.suggestion
        );
    }

    Ok(())
}

async fn run_ls(opts: LsOptions, settings: Settings) -> Result<()> {
    let case_insensitive = opts.shared.ignore_case || settings.ignore_case;
    let groups = resolve(opts.shared.paths.as_slice(), true, case_insensitive)?;

    let mode = Mode::List(ListSettings {
        dest: destination(&opts.shared, &settings),
        conflicts_only: opts.conflicts_only,
        prefix: opts.prefix,
    });

    let fetcher = open_fetcher(&settings)?;
    execute(&fetcher, &groups, &mode).await?;

    Ok(())
}
