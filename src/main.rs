use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use hostscan::config::Settings;
use hostscan::context::ScanContext;
use hostscan::engine::scan;
use hostscan::output::{print_summary, write_result, OutputFormat};
use hostscan::plugin::Capabilities;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit codes: partial per-plugin failures still count as a successful scan.
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "hostscan")]
#[command(
    author,
    version,
    about = "Scan filesystem roots for installed software and produce SBOM output"
)]
struct Cli {
    /// Directory to scan; repeatable. Defaults to the platform root.
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// Write the result in binary form to this file.
    #[arg(long)]
    result: Option<PathBuf>,

    /// FORMAT=PATH output pair, e.g. -o spdx23-json=sbom.spdx.json; repeatable.
    #[arg(short = 'o', long = "output", value_name = "FORMAT=PATH")]
    outputs: Vec<String>,

    /// Load settings from a TOML file; CLI flags override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Filesystem extractors to run, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    filesystem_extractors: Option<Vec<String>>,

    /// Standalone extractors to run, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    standalone_extractors: Option<Vec<String>>,

    /// Detectors to run, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    detectors: Option<Vec<String>>,

    /// Only stat and dispatch these files instead of walking the roots.
    #[arg(long, value_delimiter = ',', value_name = "PATHS")]
    files_to_extract: Vec<PathBuf>,

    /// Directory subtrees to prune, comma separated.
    #[arg(long = "skip-dirs", value_delimiter = ',', value_name = "PATHS")]
    dirs_to_skip: Vec<PathBuf>,

    /// Prune directories matching this regex.
    #[arg(long)]
    skip_dir_regex: Option<String>,

    /// Follow and dispatch symlinked files.
    #[arg(long)]
    read_symlinks: bool,

    /// Abort after observing this many filesystem entries (0 = unlimited).
    #[arg(long)]
    max_inodes: Option<u64>,

    /// Store inventory locations as absolute paths.
    #[arg(long)]
    store_absolute_path: bool,

    /// Skip plugins this host cannot run.
    #[arg(long)]
    filter_by_capabilities: bool,

    /// Fail when a detector's required extractor is not enabled.
    #[arg(long)]
    explicit_extractors: bool,

    /// Windows only: scan every mounted drive instead of C:\.
    #[arg(long)]
    windows_all_drives: bool,

    /// Give up after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let outputs = parse_outputs(&cli.outputs)?;
    if cli.result.is_none() && outputs.is_empty() {
        anyhow::bail!("either --result or --output needs to be set");
    }

    let settings = merge_settings(&cli)?;
    let config = settings.build(Capabilities::running_host())?;

    let ctx = match cli.timeout {
        Some(secs) => ScanContext::with_deadline(Instant::now() + Duration::from_secs(secs)),
        None => ScanContext::new(),
    };

    let result = scan(&ctx, &config).await?;

    if let Some(path) = &cli.result {
        tracing::info!(path = %path.display(), "writing scan result");
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_result(
            &result,
            OutputFormat::Binproto,
            &settings.spdx,
            &settings.cdx,
            &mut file,
        )?;
    }
    for (format, path) in &outputs {
        tracing::info!(%format, path = %path.display(), "writing scan result");
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_result(&result, *format, &settings.spdx, &settings.cdx, &mut file)?;
    }

    print_summary(&result);

    if result.status.success {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::ERROR)
    }
}

/// Splits and validates `FORMAT=PATH` output arguments.
fn parse_outputs(args: &[String]) -> Result<Vec<(OutputFormat, PathBuf)>> {
    args.iter()
        .map(|arg| {
            let (format, path) = arg.split_once('=').context(
                "invalid output, expected a format like -o spdx23-json=result.spdx.json",
            )?;
            let format = OutputFormat::from_str(format).map_err(|err| anyhow::anyhow!(err))?;
            Ok((format, PathBuf::from(path)))
        })
        .collect()
}

/// Layers CLI flags over the config file (or defaults).
fn merge_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if !cli.roots.is_empty() {
        settings.scan_roots = cli.roots.clone();
    }
    if let Some(extractors) = &cli.filesystem_extractors {
        settings.filesystem_extractors = extractors.clone();
    }
    if let Some(extractors) = &cli.standalone_extractors {
        settings.standalone_extractors = extractors.clone();
    }
    if let Some(detectors) = &cli.detectors {
        settings.detectors = detectors.clone();
    }
    if !cli.files_to_extract.is_empty() {
        settings.files_to_extract = cli.files_to_extract.clone();
    }
    if !cli.dirs_to_skip.is_empty() {
        settings.dirs_to_skip = cli.dirs_to_skip.clone();
    }
    if cli.skip_dir_regex.is_some() {
        settings.skip_dir_regex = cli.skip_dir_regex.clone();
    }
    if let Some(max_inodes) = cli.max_inodes {
        settings.max_inodes = max_inodes;
    }
    settings.read_symlinks |= cli.read_symlinks;
    settings.store_absolute_path |= cli.store_absolute_path;
    settings.filter_by_capabilities |= cli.filter_by_capabilities;
    settings.explicit_extractors |= cli.explicit_extractors;
    settings.all_drives |= cli.windows_all_drives;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outputs() {
        let outputs = parse_outputs(&[
            "spdx23-json=a.json".to_string(),
            "cdx-xml=b.xml".to_string(),
        ])
        .unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].0, OutputFormat::Spdx23Json);
        assert_eq!(outputs[1].1, PathBuf::from("b.xml"));
    }

    #[test]
    fn test_parse_outputs_rejects_unknown_format() {
        assert!(parse_outputs(&["html=a.html".to_string()]).is_err());
    }

    #[test]
    fn test_parse_outputs_rejects_missing_path() {
        assert!(parse_outputs(&["spdx23-json".to_string()]).is_err());
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "hostscan",
            "--root",
            "/srv",
            "--detectors",
            "vuln/openssl,misconfig/world-writable",
            "--max-inodes",
            "100",
            "--result",
            "out.bin",
        ]);
        let settings = merge_settings(&cli).unwrap();
        assert_eq!(settings.scan_roots, vec![PathBuf::from("/srv")]);
        assert_eq!(settings.detectors.len(), 2);
        assert_eq!(settings.max_inodes, 100);
        // Unset flags keep the defaults.
        assert_eq!(settings.filesystem_extractors.len(), 2);
    }
}
