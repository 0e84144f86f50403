//! Terminal rendering of pipeline events.

use std::time::Duration;

use delve_core::gather::GatherEvent;
use delve_core::ResearchProgress;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::display::{self, truncate};

/// Renders events until both channels close.
pub fn spawn(
    mut gather_rx: UnboundedReceiver<GatherEvent>,
    mut progress_rx: UnboundedReceiver<ResearchProgress>,
    verbose: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = create_spinner("Starting...");
        let mut gather_open = true;
        let mut progress_open = true;

        while gather_open || progress_open {
            tokio::select! {
                // gather events precede the stage that follows them
                biased;
                event = gather_rx.recv(), if gather_open => match event {
                    Some(event) => on_gather(&spinner, event, verbose),
                    None => gather_open = false,
                },
                progress = progress_rx.recv(), if progress_open => match progress {
                    Some(progress) => on_progress(&spinner, progress),
                    None => progress_open = false,
                },
            }
        }

        spinner.finish_and_clear();
    })
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn on_gather(pb: &ProgressBar, event: GatherEvent, verbose: bool) {
    match event {
        GatherEvent::Searching { desired } => pb.set_message(format!("Searching for {desired} sources...")),
        GatherEvent::ManualCandidates { count } => pb.set_message(format!("Using {count} provided URLs")),
        GatherEvent::CandidatesFound { count } => pb.set_message(format!("Found {count} candidates")),
        GatherEvent::RoundStarted { round, count } => {
            pb.set_message(format!("Extracting {count} sources ({round})..."))
        }
        GatherEvent::Accepted { url, medium, chars, .. } => {
            if verbose {
                pb.println(format!("✓ [{medium}] {} ({chars} chars)", truncate(&url, 60)));
            }
        }
        GatherEvent::Rejected { url, reason } => {
            if verbose {
                pb.println(format!("✗ {}: {reason}", truncate(&url, 60)));
            }
        }
        GatherEvent::RoundFinished { round, accepted, failed } => {
            if verbose || failed > 0 {
                pb.println(format!("{round}: {accepted} extracted, {failed} failed"));
            }
        }
        GatherEvent::Finished { accepted, min_sources } => {
            if accepted < min_sources {
                pb.println(format!("Only found {accepted} of {min_sources} wanted sources"));
            } else {
                pb.println(format!("✓ Gathered {accepted} sources"));
            }
        }
    }
}

fn on_progress(pb: &ProgressBar, progress: ResearchProgress) {
    match progress {
        ResearchProgress::Gathering => pb.set_message("Gathering sources..."),
        ResearchProgress::Evaluating { count } => {
            pb.set_message(format!("Evaluating relevance of {count} sources..."))
        }
        ResearchProgress::SourcesSelected { sources } => {
            pb.suspend(|| {
                println!();
                print!("{}", display::sources_table(&sources));
                println!();
            });
        }
        ResearchProgress::Generating { count } => {
            pb.set_message(format!("Generating research report from {count} sources..."))
        }
        ResearchProgress::Saved { .. } => pb.set_message("Done"),
    }
}
