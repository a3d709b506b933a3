use bookend::batch::BatchSelector;
use bookend::{config, output, patch, sanitize};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "bookend")]
#[command(about = "Pre- and post-build tooling for chunked static site builds")]
#[command(long_about = "\
Pre- and post-build tooling for chunked static site builds

The page build cannot materialize every page in one invocation, and the
serverless bundler emits module filenames the function runtime cannot load.
bookend wraps the build on both sides:

  bookend plan                 # which keys this invocation builds
  bookend patch                # thread batch selection into the entry sources
  <the page build>             # external, untouched
  bookend sanitize             # repair forbidden characters in the output
  bookend restore              # put the patched entry sources back

Batching is driven by environment variables:

  BUILD_PAGE_NUMBER   zero-based batch index (unset = build everything)
  PAGES_PER_BUILD     keys per batch (default 2000)

An orchestrator probes increasing BUILD_PAGE_NUMBER values and treats the
first empty batch as the end of the sequence. Empty batches and no-work
sanitizer runs exit 0 — absence of work is not failure.

Run 'bookend gen-config' to generate a documented bookend.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project root containing bookend.toml
    #[arg(long, default_value = ".", global = true)]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that select a batch.
#[derive(clap::Args, Clone)]
struct BatchArgs {
    /// Zero-based batch index; unset means the full sequence
    #[arg(long, env = "BUILD_PAGE_NUMBER")]
    page_number: Option<usize>,

    /// Keys per batch (falls back to [batch].pages_per_build)
    #[arg(long, env = "PAGES_PER_BUILD")]
    pages_per_build: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the page-key batch for this build invocation
    Plan {
        #[command(flatten)]
        batch: BatchArgs,

        /// File with one page key per line (stdin when omitted)
        #[arg(long)]
        keys: Option<PathBuf>,

        /// Print only the selected keys, one per line
        #[arg(long)]
        list: bool,
    },
    /// Inject batch slicing into the page-generation entry sources (backup first)
    Patch,
    /// Copy backed-up entry sources back over the patched originals
    Restore,
    /// Repair forbidden characters in a build-output tree
    Sanitize {
        /// Output root (defaults to the first configured root that exists)
        root: Option<PathBuf>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock bookend.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.project_root)?;

    match cli.command {
        Command::Plan { batch, keys, list } => {
            let all_keys = read_keys(keys.as_deref())?;
            let selector = BatchSelector {
                index: batch.page_number,
                size: batch
                    .pages_per_build
                    .unwrap_or(config.batch.pages_per_build),
            };
            let selected = selector.select(&all_keys);
            if list {
                for key in selected {
                    println!("{key}");
                }
            } else {
                output::print_plan_output(&selector.plan(all_keys.len()), selector.size);
            }
        }
        Command::Patch => {
            let outcomes = patch::patch_all(&cli.project_root, &config)?;
            let script = patch::write_restore_script(&cli.project_root, &config)?;
            output::print_patch_output(&outcomes, &script);
        }
        Command::Restore => {
            let report = patch::restore(&cli.project_root, &config)?;
            output::print_restore_output(&report);
        }
        Command::Sanitize { root, json } => {
            let root = sanitize::resolve_root(&cli.project_root, &config.sanitize, root)?;
            let options = sanitize::SanitizeOptions::from(&config.sanitize);
            let report = sanitize::sanitize(&root, &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_sanitize_report(&report);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Read the full ordered key sequence: one key per line, blank lines skipped.
fn read_keys(path: Option<&std::path::Path>) -> std::io::Result<Vec<String>> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    Ok(content
        .lines()
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
