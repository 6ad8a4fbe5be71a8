//! Per-file progress display with a rolling window of recent files

use crate::io::configuration::{MAX_INDIVIDUAL_PROGRESS_BARS, PROGRESS_BAR_WIDTH};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::LazyLock;

/// Coordinates progress display for one processing stage
///
/// A batch bar counts processed files. Below it, the most recent files are
/// listed one per line, completed ones with a check mark.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    batch_bar: Option<ProgressBar>,
    file_bars: Vec<ProgressBar>,
    /// Display names of started files, in processing order
    file_states: Vec<String>,
    completed: usize,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static FILE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("  {prefix}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "[{{elapsed_precise}}] {{msg}}: [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
});

impl ProgressManager {
    /// Create a new progress manager
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            batch_bar: None,
            file_bars: Vec::new(),
            file_states: Vec::new(),
            completed: 0,
        }
    }

    /// Set up the bars for a stage processing `file_count` files
    pub fn initialize(&mut self, stage: &'static str, file_count: usize) {
        self.clear();

        let batch_bar = ProgressBar::new(file_count as u64);
        batch_bar.set_style(BATCH_STYLE.clone());
        batch_bar.set_message(stage);
        self.batch_bar = Some(self.multi_progress.add(batch_bar));

        for _ in 0..file_count.min(MAX_INDIVIDUAL_PROGRESS_BARS) {
            let pb = ProgressBar::new(0);
            pb.set_style(FILE_STYLE.clone());
            self.file_bars.push(self.multi_progress.add(pb));
        }
    }

    /// Show `path` as the file currently processed
    pub fn start_file(&mut self, path: &Path) {
        let display_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        self.file_states.push(display_name);
        self.update_bars();
    }

    /// Mark the most recently started file as completed
    pub fn complete_file(&mut self) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.inc(1);
        }
        self.completed += 1;
        self.update_bars();
    }

    /// Number of files completed in the current stage
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// Number of files started in the current stage
    pub fn started(&self) -> usize {
        self.file_states.len()
    }

    /// Finish the stage and remove its bars from the terminal
    pub fn finish(&mut self) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.finish();
        }
        self.clear_terminal();
    }

    fn clear_terminal(&self) {
        if let Err(e) = self.multi_progress.clear() {
            tracing::debug!("Could not clear progress bars: {e}");
        }
    }

    fn clear(&mut self) {
        self.clear_terminal();
        self.batch_bar = None;
        self.file_bars.clear();
        self.file_states.clear();
        self.completed = 0;
    }

    /// Show the last N started files
    fn update_bars(&self) {
        let start_idx = self
            .file_states
            .len()
            .saturating_sub(MAX_INDIVIDUAL_PROGRESS_BARS);
        let visible = self.file_states.get(start_idx..).unwrap_or(&[]);

        for (bar_idx, name) in visible.iter().enumerate() {
            if let Some(bar) = self.file_bars.get(bar_idx) {
                let done = start_idx + bar_idx < self.completed;
                bar.set_prefix(if done {
                    format!("✓ {name}")
                } else {
                    format!("… {name}")
                });
            }
        }
    }
}
