use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Controls how step output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Spinners + checkmarks on a live terminal.
    Normal,
    /// Like Normal, plus debug tracing on stderr.
    Verbose,
    /// No ANSI — plain println output (for piped/non-TTY).
    Plain,
}

/// Orchestrates numbered pipeline steps with spinners and checkmarks.
pub struct StepProgress {
    multi: MultiProgress,
    total_steps: usize,
    current_step: usize,
    mode: OutputMode,
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("[{prefix}] {spinner:.cyan} {msg}")
        .expect("valid spinner template")
}

fn done_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("[{prefix}] \u{2713} {msg:.green}")
        .expect("valid done template")
}

impl StepProgress {
    pub fn new(total_steps: usize, mode: OutputMode) -> Self {
        let multi = if mode == OutputMode::Plain {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            multi,
            total_steps,
            current_step: 0,
            mode,
        }
    }

    /// Run an async task as a numbered step: spinner while running,
    /// checkmark on completion.
    pub async fn run<F, Fut, T>(&mut self, label: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.current_step += 1;
        let prefix = format!("{}/{}", self.current_step, self.total_steps);

        if self.mode == OutputMode::Plain {
            println!("[{prefix}] {label}");
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_prefix(prefix.clone());
        bar.set_message(label.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(80));

        let result = f().await;

        if self.mode == OutputMode::Plain {
            println!("[{prefix}] \u{2713} {label}");
        }

        bar.set_style(done_style());
        bar.finish_with_message(label.to_string());

        result
    }

    /// Instant completion — no task to run (cached/skipped items).
    pub fn skip(&mut self, label: &str) {
        self.current_step += 1;
        let prefix = format!("{}/{}", self.current_step, self.total_steps);

        if self.mode == OutputMode::Plain {
            println!("[{prefix}] \u{2713} {label}");
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(done_style());
        bar.set_prefix(prefix);
        bar.set_message(label.to_string());
        bar.finish();
    }

    /// Print a plain line without disturbing the managed bars.
    pub fn println(&self, text: &str) {
        if self.mode == OutputMode::Plain {
            println!("{text}");
        } else {
            self.multi.println(text).ok();
        }
    }

    /// Whether child progress bars (download) should be visible.
    pub fn show_bars(&self) -> bool {
        self.mode != OutputMode::Plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_closure_result() {
        let mut progress = StepProgress::new(2, OutputMode::Plain);
        let value = progress.run("step one", || async { 41 + 1 }).await;
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn steps_are_numbered_sequentially() {
        let mut progress = StepProgress::new(3, OutputMode::Plain);
        progress.skip("cached");
        progress.run("work", || async {}).await;
        assert_eq!(progress.current_step, 2);
    }
}
