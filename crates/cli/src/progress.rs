//! Progress reporting and visualization for CLI

use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use recdedup_core::pipeline::PipelineStats;
use recdedup_core::Statistics;

/// One spinner per pipeline stage
///
/// Each call to [`StageProgress::start`] closes the running stage and
/// records how long it took.
pub struct StageProgress {
    enabled: bool,
    bar: Option<ProgressBar>,
    current: Option<(&'static str, Instant)>,
    timings: Vec<(&'static str, Duration)>,
}

impl StageProgress {
    /// Create a reporter; a disabled one only collects timings
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bar: None,
            current: None,
            timings: Vec::new(),
        }
    }

    /// Begin a stage
    pub fn start(&mut self, stage: &'static str) {
        self.close_current();

        if self.enabled {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar.set_message(format!("Running {}...", stage));
            bar.enable_steady_tick(Duration::from_millis(100));
            self.bar = Some(bar);
        }
        self.current = Some((stage, Instant::now()));
    }

    /// Close the last stage and return per-stage durations
    pub fn finish(mut self) -> Vec<(&'static str, Duration)> {
        self.close_current();
        self.timings
    }

    fn close_current(&mut self) {
        if let Some((stage, started)) = self.current.take() {
            let elapsed = started.elapsed();
            if let Some(bar) = self.bar.take() {
                bar.finish_with_message(format!("{} ({})", stage, format_duration(elapsed)));
            }
            self.timings.push((stage, elapsed));
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Progress bar for reading a dataset, by bytes when the size is known
pub fn load_bar(total_bytes: Option<u64>, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    match total_bytes {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(
                    "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░-"),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar
        }
    }
}

/// Print a formatted summary report
pub fn print_summary_report(
    input: &Path,
    output: Option<&Path>,
    stats: &PipelineStats,
    statistics: &Statistics,
    timings: &[(&'static str, Duration)],
) {
    println!("\n{}", "═".repeat(60));
    println!("Entity Resolution Complete");
    println!("{}", "═".repeat(60));
    println!("Input:              {}", input.display());

    if let Some(output_dir) = output {
        println!("Output:             {}", output_dir.display());
    } else {
        println!("Output:             (dry run - no output written)");
    }

    println!("Total records:      {}", format_with_commas(stats.total_records));

    if stats.exact_duplicates > 0 {
        println!(
            "Exact duplicates:   {} ({:.1}%)",
            format_with_commas(stats.exact_duplicates),
            percentage(stats.exact_duplicates, stats.total_records)
        );
    }

    println!("Blocks:             {}", format_with_commas(stats.blocks));
    println!(
        "Candidate pairs:    {}",
        format_with_commas(stats.candidate_pairs)
    );
    println!("Matches:            {}", format_with_commas(stats.matches));
    println!(
        "Duplicates found:   {} ({:.2}%)",
        format_with_commas(statistics.detected_duplicates),
        statistics.duplicate_percentage
    );
    if let Some(average) = statistics.average_similarity_per_block {
        println!("Avg similarity:     {:.2}", average);
    }
    println!(
        "Final dataset:      {} ({:.1}%)",
        format_with_commas(stats.unique_records),
        stats.retention_rate()
    );

    if !timings.is_empty() {
        println!("{}", "─".repeat(60));
        for (stage, elapsed) in timings {
            println!("{:<20}{}", format!("{}:", stage), format_duration(*elapsed));
        }
    }

    println!("{}", "═".repeat(60));
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Format number with thousand separators
fn format_with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_duration(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 60 {
        format!("{}m {:02}s", elapsed.as_secs() / 60, elapsed.as_secs() % 60)
    } else if elapsed.as_millis() >= 1000 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
