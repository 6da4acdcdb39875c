//! Headless host for the audio indexer.
//!
//! Watches one folder, keeps its `.tuna.dat` index current and prints status
//! lines. Commands read from stdin: `rescan`, `status`, `quit`.

use std::io::BufRead;
use std::path::PathBuf;

use time::format_description::well_known::Rfc3339;
use tuna_indexer::config::{self, IndexerConfig};
use tuna_indexer::indexer::PassOutcome;
use tuna_indexer::logging::{self, Verbosity};
use tuna_indexer::{IndexService, IndexerHooks, SymphoniaTagReader};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliOptions {
    root: Option<PathBuf>,
    config_path: Option<PathBuf>,
    once: bool,
    wipe: bool,
    verbose: bool,
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let verbosity = if options.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    if let Err(err) = logging::init_with(verbosity) {
        eprintln!("Logging disabled: {err}");
    }

    let mut config = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let root = resolve_root(&options, &mut config)?;

    let hooks = IndexerHooks::default().with_status(|text| {
        if !text.is_empty() {
            println!("{text}");
        }
    });
    let reader = Box::new(SymphoniaTagReader::new());

    if options.wipe {
        let service =
            IndexService::open(&root, &config, reader, hooks).map_err(|err| err.to_string())?;
        service.wipe().map_err(|err| err.to_string())?;
        println!("Wiped index for {}", root.display());
        return Ok(());
    }

    if options.once {
        let service =
            IndexService::open(&root, &config, reader, hooks).map_err(|err| err.to_string())?;
        service.rescan(true).map_err(|err| err.to_string())?;
        let outcome = service.run_pass_now().map_err(|err| err.to_string())?;
        print_outcome(&service, &outcome);
        return Ok(());
    }

    let mut service =
        IndexService::start(&root, &config, reader, hooks).map_err(|err| err.to_string())?;
    println!("Watching {} (commands: rescan, status, quit)", root.display());
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        match line.trim() {
            "" => {}
            "rescan" => {
                if let Err(err) = service.rescan(true) {
                    eprintln!("Rescan failed: {err}");
                }
            }
            "status" => print_status(&service),
            "quit" | "exit" => break,
            other => eprintln!("Unknown command: {other}"),
        }
    }
    service.stop();
    Ok(())
}

/// Pick the watch root from the command line or the saved config, remembering a new one.
fn resolve_root(options: &CliOptions, config: &mut IndexerConfig) -> Result<PathBuf, String> {
    let Some(root) = options.root.clone().or_else(|| config.watch_root.clone()) else {
        return Err(format!(
            "No folder to watch. Pass one on the command line.\n\n{}",
            help_text()
        ));
    };
    if config.watch_root.as_ref() != Some(&root) {
        config.watch_root = Some(root.clone());
        let saved = match &options.config_path {
            Some(path) => config::save_to_path(config, path),
            None => config::save(config),
        };
        if let Err(err) = saved {
            tracing::warn!(error = %err, "Could not remember watch folder");
        }
    }
    Ok(root)
}

fn print_outcome(service: &IndexService, outcome: &PassOutcome) {
    match outcome {
        PassOutcome::Indexed(report) => {
            println!(
                "Indexed {} files ({} read, {} failed, {} removed)",
                report.entries, report.extracted, report.failed, report.removed
            );
            if report.errors_occurred {
                println!("See {} for files that were skipped", service.log_path().display());
            }
        }
        PassOutcome::NoChanges(_) => println!("No changes detected"),
        PassOutcome::NoMusic => println!("Found no music"),
        PassOutcome::Skipped(reason) => println!("Pass skipped: {reason:?}"),
    }
}

fn print_status(service: &IndexService) {
    let last = service
        .last_index_date()
        .and_then(|date| date.format(&Rfc3339).ok())
        .unwrap_or_else(|| "never".to_string());
    println!("Root: {}", service.root().display());
    println!("State: {:?}", service.state());
    println!("Last indexed: {last}");
    match service.all_files() {
        Ok(files) => println!("Files: {}", files.len()),
        Err(err) => eprintln!("Could not read cache: {err}"),
    }
    match service.error_count() {
        Ok(0) => {}
        Ok(count) => println!(
            "{count} files not indexed, see {}",
            service.log_path().display()
        ),
        Err(err) => eprintln!("Could not read cache: {err}"),
    }
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--once" => options.once = true,
            "--wipe" => options.wipe = true,
            "-v" | "--verbose" => options.verbose = true,
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            path => {
                if options.root.is_some() {
                    return Err(format!("Only one folder can be watched\n\n{}", help_text()));
                }
                options.root = Some(PathBuf::from(path));
            }
        }
        idx += 1;
    }
    if options.once && options.wipe {
        return Err("--once and --wipe cannot be combined".to_string());
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "tuna-indexer",
        "",
        "Usage:",
        "  tuna-indexer [--once] [--wipe] [--verbose] [--config <file>] [<folder>]",
        "",
        "  --once      index the folder once and exit",
        "  --wipe      delete the index and cached metadata for the folder",
        "  --verbose   debug logging for the indexer",
        "  --config    settings file (default: config.toml in the app folder)",
    ]
    .join("\n")
}
