//! fsprobe - list mounted filesystems and wait for file modifications.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use fsprobe_core::{Error, MountEntry, Result, TypeFilter, Watcher, read_mounts};

/// fsprobe CLI tool.
#[derive(Parser)]
#[command(name = "fsprobe")]
#[command(about = "Inspect mounted filesystems and watch paths for changes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List mounted filesystems, newest mount first.
    List {
        /// Filesystem types to keep ("ext4,vfat") or drop ("noext4,novfat").
        #[arg(short = 't', long = "types")]
        types: Option<String>,

        /// Read this mount table file instead of the live system table.
        #[arg(long)]
        table: Option<PathBuf>,

        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Block until one of the given paths is modified, printing each event.
    ///
    /// Runs until killed; paths the kernel refuses to watch are skipped
    /// with a warning.
    Watch {
        /// Paths to watch.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { types, table, json } => run_list(types, table, json),
        Commands::Watch { paths } => run_watch(paths),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fsprobe: {e}");
            ExitCode::FAILURE
        }
    }
}

/// JSON row for one mount entry.
#[derive(Serialize)]
struct MountRecord<'a> {
    device: &'a str,
    dir: &'a std::path::Path,
    fs_type: &'a str,
    opts: &'a str,
    meta: &'a fsprobe_core::MetaSnapshot,
    space: &'a fsprobe_core::SpaceSnapshot,
}

impl<'a> From<&'a MountEntry> for MountRecord<'a> {
    fn from(entry: &'a MountEntry) -> Self {
        Self {
            device: entry.device(),
            dir: entry.dir(),
            fs_type: entry.fs_type(),
            opts: entry.opts(),
            meta: entry.meta(),
            space: entry.space(),
        }
    }
}

fn run_list(types: Option<String>, table: Option<PathBuf>, json: bool) -> Result<()> {
    let filter = TypeFilter::parse(types.as_deref())?;
    let mut mounts = read_mounts(table.as_deref())?;
    mounts.retain(|m| filter.matches_entry(m));

    if json {
        let records: Vec<MountRecord> = mounts.iter().map(MountRecord::from).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&records).unwrap_or_default()
        );
        return Ok(());
    }

    for mount in &mounts {
        let space = mount.space();
        if space.blocks > 0 {
            println!(
                "{} on {} type {} ({}) {}/{} bytes used",
                mount.device(),
                mount.dir().display(),
                mount.fs_type(),
                mount.opts(),
                space.used_bytes(),
                space.total_bytes(),
            );
        } else {
            println!(
                "{} on {} type {} ({})",
                mount.device(),
                mount.dir().display(),
                mount.fs_type(),
                mount.opts(),
            );
        }
    }
    Ok(())
}

fn run_watch(paths: Vec<PathBuf>) -> Result<()> {
    let mut watcher = Watcher::with_capacity(paths.len())?;

    for (tag, path) in paths.into_iter().enumerate() {
        match watcher.add(tag as u64, &path) {
            Ok(()) => {}
            Err(e @ Error::WatchRejected { .. }) => {
                eprintln!("fsprobe: skipping {}: {e}", path.display());
            }
            Err(e) => return Err(e),
        }
    }

    if watcher.is_empty() {
        eprintln!("fsprobe: nothing to watch");
        return Ok(());
    }

    loop {
        let (_, path) = watcher.wait()?;
        println!("{}", path.display());
    }
}
