use anyhow::Result;
use clap::{Parser, Subcommand};
use mm_survey::commands::{correlate_command, list_sources_command, scan_command, ScanOptions};

/// Management-mode module survey CLI.
///
/// This CLI is a thin wrapper around `survey-core` (exposed in code as
/// `survey_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "mm-survey",
    version,
    about = "Survey management-mode modules in UEFI firmware images",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a firmware image for management-mode modules.
    ///
    /// This will:
    /// - Build the module tree through a tree source.
    /// - Classify files whose type is in the target set.
    /// - Extract each match's executable section to `modules/`.
    /// - Write `scan_report.txt` and `run_metadata.json`.
    Scan {
        /// Path to the firmware image to scan.
        #[arg(long)]
        image: String,

        /// Survey output root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Use a pre-dumped module tree manifest instead of running a decoder.
        #[arg(long)]
        manifest: Option<String>,

        /// Path to the external volume decoder (overrides the environment).
        #[arg(long)]
        tool: Option<String>,

        /// Scan profile file (YAML or JSON).
        #[arg(long)]
        profile: Option<String>,

        /// Comma-separated module types to target (labels like FV_MM or codes
        /// like 0x0E). Overrides the profile.
        #[arg(long)]
        types: Option<String>,

        /// Classify only; write no section artifacts.
        #[arg(long, default_value_t = false)]
        no_extract: bool,

        /// Emit matched modules as JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Correlate per-module analysis records onto a scan report.
    ///
    /// Reads `{guid}_{name}.json` from the analysis directory for every scan
    /// report entry and writes the handler report.
    Correlate {
        /// Directory holding per-module analysis records.
        #[arg(long)]
        analysis_dir: String,

        /// Survey output root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Scan report to read. Defaults to `scan_report.txt` under the root.
        #[arg(long)]
        scan_report: Option<String>,

        /// Handler report to write. Defaults to `handler_report.txt` under the root.
        #[arg(long)]
        out: Option<String>,

        /// Skip modules with no analysis record instead of failing.
        #[arg(long, default_value_t = false)]
        skip_missing: bool,

        /// Emit correlated modules as JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the module tree sources known to this binary.
    Sources {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan { image, root, manifest, tool, profile, types, no_extract, json } => {
            scan_command(&ScanOptions {
                image,
                root,
                manifest,
                tool,
                profile,
                types,
                no_extract,
                json,
            })?
        }
        Command::Correlate { analysis_dir, root, scan_report, out, skip_missing, json } => {
            correlate_command(
                &root,
                &analysis_dir,
                scan_report.as_deref(),
                out.as_deref(),
                skip_missing,
                json,
            )?
        }
        Command::Sources { json } => list_sources_command(json)?,
    }

    Ok(())
}
