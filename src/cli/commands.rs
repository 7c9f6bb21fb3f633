//! Command implementations

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::app::inspect_interactor::{format_media_summary, preview_target};
use crate::app::AppContainer;
use crate::cli::args::{CutArgs, PreviewArgs, ProbeArgs};
use crate::domain::model::JobOutcome;
use crate::engine::{ConsoleProgressSink, NullSink, ProgressSink};

/// Exit status for a run stopped by the user
const EXIT_CANCELLED: u8 = 130;

/// Execute the cut command
///
/// Ctrl-C asks the encoder to stop; the partial output is left in place.
pub async fn cut(container: &dyn AppContainer, args: CutArgs) -> Result<ExitCode> {
    let request = args.to_request().context("Invalid cut arguments")?;
    let interactor = container.cut_interactor()?;

    let sink: Arc<dyn ProgressSink> = if args.quiet || args.json {
        Arc::new(NullSink)
    } else {
        Arc::new(ConsoleProgressSink::new(args.verbose))
    };

    let run = interactor.execute(request, sink).await?;
    let canceller = run.canceller();
    info!(output = %run.job().output().display(), "Cutting");

    let finish = run.finish();
    tokio::pin!(finish);
    let mut interrupted = false;
    let report = loop {
        tokio::select! {
            report = &mut finish => break report?,
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                signal.context("Failed to listen for Ctrl-C")?;
                interrupted = true;
                warn!("Interrupt received, stopping encoder");
                if let Err(e) = canceller.cancel() {
                    debug!(error = %e, "Cancel after the run ended");
                }
            }
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        println!("{}", json);
    } else {
        println!("{}", report.summary());
    }

    match &report.outcome {
        JobOutcome::Succeeded { .. } => Ok(ExitCode::SUCCESS),
        JobOutcome::Failed { failure, diagnostics } => {
            error!(%failure, "Encoding failed");
            if !args.json && !diagnostics.is_empty() {
                eprintln!("Last encoder messages:\n{}", diagnostics);
            }
            Ok(ExitCode::FAILURE)
        }
        JobOutcome::Cancelled => Ok(ExitCode::from(EXIT_CANCELLED)),
    }
}

/// Execute the probe command
pub async fn probe(container: &dyn AppContainer, args: ProbeArgs) -> Result<ExitCode> {
    let interactor = container.inspect_interactor()?;
    let media = interactor.inspect(&args.input).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&media).context("Failed to serialize media info to JSON")?;
        println!("{}", json);
    } else {
        println!("{}", format_media_summary(&media));
    }
    Ok(ExitCode::SUCCESS)
}

/// Execute the preview command
pub fn preview(args: PreviewArgs) -> Result<ExitCode> {
    let target = preview_target(&args.input, args.start.as_deref())?;
    let json = serde_json::to_string_pretty(&target).context("Failed to serialize preview target")?;
    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}
