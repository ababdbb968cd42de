//! Tracelink command line entrypoint.
//!
//! `tracelink merge [--force] <source-path>...` folds cache files produced
//! elsewhere into the configured cache directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use mimalloc::MiMalloc;

use tracelink::cache::{Cache, CacheManager};
use tracelink::config::Config;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "usage: tracelink merge [--force] <source-path>...";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("merge") => {}
        None | Some("-h") | Some("--help") => {
            println!("{USAGE}");
            return Ok(());
        }
        Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
    }

    let mut force = false;
    let mut sources = Vec::new();
    for arg in args {
        if arg == "--force" {
            force = true;
        } else {
            sources.push(PathBuf::from(arg));
        }
    }
    if sources.is_empty() {
        bail!(USAGE);
    }

    let config = Config::from_env()?;
    config.validate()?;

    let manager = match &config.redis_url {
        Some(url) => CacheManager::with_redis(config.cache_dir.clone(), url).await?,
        None => CacheManager::new(config.cache_dir.clone())?,
    };
    tracing::info!(dir = %manager.dir().display(), force, "Merging caches");

    let mut skipped = 0usize;
    for source_path in &sources {
        for source in open_sources(source_path)? {
            let target = manager.open_file(Path::new(source.name()), true)?;
            let report = target
                .merge(&source, force)
                .await
                .with_context(|| format!("merging {}", source.local().path().display()))?;

            if report.has_conflicts() {
                println!(
                    "{}: {} conflicting keys{}",
                    source.local().path().display(),
                    report.conflicts.len(),
                    if report.applied { ", overwritten" } else { ", skipped" },
                );
                for key in &report.conflicts {
                    println!("  {key}");
                }
            }
            if report.applied {
                println!(
                    "{} -> {}: {} added, {} overwritten",
                    source.local().path().display(),
                    target.local().path().display(),
                    report.added,
                    report.overwritten,
                );
            } else {
                skipped += 1;
            }
        }
    }

    manager.flush_all().await?;
    if skipped > 0 {
        println!("{skipped} file(s) skipped because of conflicts; rerun with --force to overwrite");
    }
    Ok(())
}

/// Caches found at `path`: the file itself, or every cache file in a directory.
fn open_sources(path: &Path) -> anyhow::Result<Vec<Arc<Cache>>> {
    if path.is_dir() {
        let sources = CacheManager::new(path)?;
        return sources
            .cache_files()?
            .iter()
            .map(|file| sources.open_file(file, false).map_err(anyhow::Error::from))
            .collect();
    }

    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let sources = CacheManager::new(dir)?;
    Ok(vec![
        sources
            .open_file(path, false)
            .with_context(|| format!("opening {}", path.display()))?,
    ])
}
