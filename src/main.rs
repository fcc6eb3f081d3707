mod report;

use anyhow::{Context, Result};
use assetstack::{Asset, CriteriaConfig, Options, stack_verbose_with};
use clap::Parser;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

/// Group photo/video assets into stacks.
#[derive(Parser, Debug)]
#[command(name = "assetstack")]
#[command(about = "Rule-based stacking of photo/video assets")]
#[command(version)]
struct Args {
    /// Criteria JSON (legacy list or advanced object); blank uses the default
    #[arg(long, env = "CRITERIA", default_value = "")]
    criteria: String,

    /// Comma-separated filename promotion list
    #[arg(long, env = "PARENT_FILENAME_PROMOTE", default_value = "")]
    parent_filename_promote: String,

    /// Comma-separated extension promotion list
    #[arg(long, env = "PARENT_EXT_PROMOTE", default_value = "")]
    parent_ext_promote: String,

    /// Leave archived assets out
    #[arg(long)]
    skip_archived: bool,

    /// Leave trashed assets out
    #[arg(long)]
    skip_trashed: bool,

    /// Print the stacks as JSON instead of the report
    #[arg(long)]
    json: bool,

    /// Force ANSI color output
    #[arg(long, overrides_with = "no_color")]
    color: bool,

    /// Disable ANSI color output
    #[arg(long, overrides_with = "color")]
    no_color: bool,

    /// JSON array of assets; reads stdin when omitted
    assets: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let configuration = err.downcast_ref::<assetstack::Error>().is_some_and(assetstack::Error::is_configuration);
            ExitCode::from(if configuration { 2 } else { 1 })
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = CriteriaConfig::parse(&args.criteria)?;
    let options = Options {
        filename_promote: args.parent_filename_promote.clone(),
        extension_promote: args.parent_ext_promote.clone(),
        skip_archived: args.skip_archived,
        skip_trashed: args.skip_trashed,
    };

    let (source, raw) = match &args.assets {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            (path.display().to_string(), raw)
        }
        None => {
            let mut raw = String::new();
            io::stdin().read_to_string(&mut raw).context("failed to read stdin")?;
            ("<stdin>".to_string(), raw)
        }
    };
    let assets: Vec<Asset> = serde_json::from_str(&raw).with_context(|| format!("invalid assets JSON in {source}"))?;
    log::info!("loaded {} assets from {}", assets.len(), source);

    let run = stack_verbose_with(&assets, &config, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run.stacks)?);
    } else {
        let color = if args.no_color { false } else { args.color || io::stdout().is_terminal() };
        report::print_run(&source, &run, color);
    }
    Ok(())
}
