mod logging;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use maskbench_core::LabelsMode;
use maskbench_engine::{ClientSettings, EngineSettings};

use crate::logging::LogDestination;
use crate::runner::{SourceArtifact, WorkflowPlan};

/// Command-line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the annotation service.
    #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:8000")]
    server: String,

    /// Source video to upload for server-side frame extraction.
    #[arg(long, value_name = "FILE", conflicts_with = "frames_zip")]
    video: Option<PathBuf>,

    /// Zip archive of pre-extracted frames to upload instead of a video.
    #[arg(long, value_name = "FILE")]
    frames_zip: Option<PathBuf>,

    /// Label export seeding the first-frame annotations. Without it the run
    /// stops after the frame upload.
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// How mask pixels are labelled: "composite" or "per_label".
    #[arg(long, default_value = "composite", value_parser = parse_labels_mode)]
    labels_mode: LabelsMode,

    /// Directory the mask export archive is written to.
    #[arg(long, value_name = "DIR", default_value = "export")]
    export_dir: PathBuf,

    /// Milliseconds between status polls while propagation runs.
    #[arg(long, value_name = "MILLIS", default_value = "1000")]
    poll_interval_ms: u64,

    /// Skip downloading the mask export archive after propagation.
    #[arg(long)]
    no_export: bool,

    /// Also write logs to ./maskbench.log.
    #[arg(long)]
    log_file: bool,

    /// Log at debug level.
    #[arg(long)]
    verbose: bool,
}

fn parse_labels_mode(raw: &str) -> Result<LabelsMode, String> {
    LabelsMode::parse(raw)
        .ok_or_else(|| format!("expected \"composite\" or \"per_label\", got \"{raw}\""))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let destination = if args.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    logging::initialize(destination, args.verbose);

    let source = match (args.video, args.frames_zip) {
        (Some(video), _) => SourceArtifact::Video(video),
        (_, Some(archive)) => SourceArtifact::FrameArchive(archive),
        _ => {
            eprintln!("maskbench: give a frame source: --video or --frames-zip");
            return ExitCode::from(2);
        }
    };

    let plan = WorkflowPlan {
        source,
        labels: args.labels,
        labels_mode: args.labels_mode,
        export: !args.no_export,
    };
    let settings = EngineSettings {
        client: ClientSettings {
            base_url: args.server,
            ..ClientSettings::default()
        },
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        export_dir: args.export_dir,
    };

    match runner::run(plan, settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_logging::engine_error!("workflow ended: {}", err);
            eprintln!("maskbench: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
