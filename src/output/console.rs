use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::engine::{ProbeResult, ResultSink};

pub fn progress_bar(len: u64) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new(len.max(1));
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_style(
        ProgressStyle::with_template(
            ":: Progress: [{pos}/{len}] :: {per_sec} :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?
        .progress_chars(r#"#>-"#),
    );
    Ok(pb)
}

pub fn format_hit_line(result: &ProbeResult) -> String {
    format!(
        "{}{}{} Size: {:<6} URL: {}",
        "[".bold().white(),
        result.status.to_string().bold().green(),
        "]".bold().white(),
        result.size,
        result.url.bold()
    )
}

/// Prints each hit above the progress bar.
pub struct ConsoleSink {
    pb: Option<ProgressBar>,
    show_content: bool,
}

impl ConsoleSink {
    pub fn new(pb: Option<ProgressBar>, show_content: bool) -> Self {
        Self { pb, show_content }
    }

    fn println(&self, line: String) {
        match self.pb.as_ref() {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }
}

impl ResultSink for ConsoleSink {
    fn on_result(&self, result: &ProbeResult) {
        self.println(format_hit_line(result));
        if self.show_content {
            self.println(format!("{}\n", result.content.trim_end()));
        }
    }

    fn on_progress(&self, finished: usize, _total: usize) {
        if let Some(pb) = self.pb.as_ref() {
            pb.set_position(finished as u64);
        }
    }
}
