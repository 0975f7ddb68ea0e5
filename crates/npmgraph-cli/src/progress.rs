//! Terminal progress bars for the pipeline phases.

use indicatif::{ProgressBar, ProgressStyle};
use npmgraph_core::{Phase, Progress};
use std::cell::RefCell;

/// Shows one `indicatif` bar per phase on stderr.
pub struct BarProgress {
    bar: RefCell<Option<ProgressBar>>,
    hidden: bool,
}

impl BarProgress {
    /// `hidden` suppresses drawing (used with `--json`, where stderr carries log lines).
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: RefCell::new(None),
            hidden,
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            f(bar);
        }
    }
}

fn style(phase: Phase, known_total: bool) -> ProgressStyle {
    let template = match (phase, known_total) {
        (Phase::Download, true) => "[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
        (Phase::Download, false) => "[{elapsed_precise}] {spinner} {bytes} {msg}",
        (_, true) => "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        (_, false) => "[{elapsed_precise}] {spinner} {pos} {msg}",
    };
    ProgressStyle::default_bar()
        .template(template)
        .map_err(|e| tracing::error!("Failed to set progress bar style: {e}"))
        .unwrap_or_else(|()| ProgressStyle::default_bar())
        .progress_chars("##-")
}

impl Progress for BarProgress {
    fn start(&self, phase: Phase, total: Option<u64>) {
        let bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            match total {
                Some(len) => ProgressBar::new(len),
                None => ProgressBar::new_spinner(),
            }
        };
        bar.set_style(style(phase, total.is_some()));
        bar.set_message(phase.label());
        if let Some(previous) = self.bar.replace(Some(bar)) {
            previous.finish_and_clear();
        }
    }

    fn set_total(&self, phase: Phase, total: u64) {
        self.with_bar(|bar| {
            bar.set_length(total);
            bar.set_style(style(phase, true));
        });
    }

    fn advance(&self, _phase: Phase, delta: u64) {
        self.with_bar(|bar| bar.inc(delta));
    }

    fn finish(&self, phase: Phase) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_with_message(format!("{} complete", phase.label()));
        }
    }
}
