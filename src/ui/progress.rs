use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

fn visible(pb: ProgressBar) -> ProgressBar {
    if console::Term::stdout().is_term() && !crate::output::is_quiet() {
        pb
    } else {
        ProgressBar::hidden()
    }
}

/// Message shown while the entry at corpus `line` is ingested
fn progress_label(line: usize, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("Ingesting line {}: {}", line, title),
        None => format!("Ingesting line {}", line),
    }
}

/// Renders ingestion progress sent by the driver over a channel.
pub struct IngestProgress {
    mp: MultiProgress,
    reading: ProgressBar,
    ingesting: ProgressBar,
    handle: Option<thread::JoinHandle<usize>>,
}

impl IngestProgress {
    pub fn new() -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let mp = MultiProgress::new();
        let reading = visible(mp.add(ProgressBar::new_spinner().with_message("Reading corpus")));
        let ingesting = visible(mp.add(ProgressBar::new_spinner().with_message("Ingesting entries")));

        let reading_clone = reading.clone();
        let ingesting_clone = ingesting.clone();

        // Returns the number of skipped entries seen
        let handle = thread::spawn(move || {
            let mut skipped = 0;
            for msg in rx {
                match msg {
                    ProgressMessage::Started { phase: ProgressPhase::Reading, .. } => {
                        reading_clone.enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::Finished { phase: ProgressPhase::Reading } => {
                        reading_clone.finish_with_message("Corpus read");
                    }
                    ProgressMessage::Started { phase: ProgressPhase::Ingesting, total } => {
                        if total > 0 {
                            ingesting_clone.set_length(total as u64);
                        }
                        ingesting_clone.enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::Progress { phase: ProgressPhase::Ingesting, line, title } => {
                        ingesting_clone.inc(1);
                        ingesting_clone.set_message(progress_label(line, title.as_deref()));
                    }
                    ProgressMessage::Finished { phase: ProgressPhase::Ingesting } => {
                        ingesting_clone.finish_with_message("Done");
                    }
                    ProgressMessage::Skipped(reason) => {
                        skipped += 1;
                        ingesting_clone.println(format!("{} {}", Icons::WARN, reason));
                    }
                    ProgressMessage::Error(reason) => {
                        ingesting_clone.abandon_with_message(format!("{} {}", Icons::CROSS, reason));
                    }
                    _ => {}
                }
            }
            skipped
        });

        (
            Self {
                mp,
                reading,
                ingesting,
                handle: Some(handle),
            },
            tx,
        )
    }

    /// Wait for the renderer once every sender is dropped
    pub fn join(&mut self) -> usize {
        self.handle
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.mp.clear().ok();
    }

    pub fn finish_with_summary(&self, duration: Duration, entries: usize, relations: usize, pending: usize) {
        self.reading.finish_and_clear();
        self.ingesting.finish_and_clear();
        self.clear();
        if crate::output::is_quiet() {
            return;
        }
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().ok.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().ok.clone())
        );
        println!(
            "  {} {}  {} {}  {} {}",
            Icons::BOOK.style(theme().accent.clone()),
            entries,
            Icons::LINK.style(theme().accent.clone()),
            relations,
            Icons::HOURGLASS.style(theme().pattern.clone()),
            pending
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = visible(ProgressBar::new_spinner());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_label_shows_corpus_line() {
        assert_eq!(progress_label(42, Some("chien")), "Ingesting line 42: chien");
        assert_eq!(progress_label(7, None), "Ingesting line 7");
    }
}
