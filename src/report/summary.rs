//! Terminal summaries: reduction, model comparison, confusion matrix

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::evaluate::ConfusionMatrix;
use crate::pipeline::preprocess::ReductionLog;
use crate::pipeline::profile::ColumnStatistics;
use crate::pipeline::selection::CandidateReport;

/// Summary of the feature reduction process
#[derive(Debug, Default)]
pub struct ReductionSummary {
    pub initial_features: usize,
    pub final_features: usize,
    pub dropped_missing: Vec<String>,
    pub dropped_identifiers: Vec<String>,
    pub dropped_variance: Vec<String>,
    pub dropped_correlation: Vec<String>,
    pub load_time: Duration,
    pub preprocess_time: Duration,
    pub training_time: Duration,
    pub save_time: Duration,
}

impl ReductionSummary {
    pub fn from_log(log: &ReductionLog) -> Self {
        Self {
            initial_features: log.initial_features,
            final_features: log.final_features,
            dropped_missing: log.missing.clone(),
            dropped_identifiers: log.identifiers.clone(),
            dropped_variance: log.variance.clone(),
            dropped_correlation: log.correlation.clone(),
            ..Default::default()
        }
    }

    pub fn set_load_time(&mut self, duration: Duration) {
        self.load_time = duration;
    }

    pub fn set_preprocess_time(&mut self, duration: Duration) {
        self.preprocess_time = duration;
    }

    pub fn set_training_time(&mut self, duration: Duration) {
        self.training_time = duration;
    }

    pub fn set_save_time(&mut self, duration: Duration) {
        self.save_time = duration;
    }

    pub fn total_time(&self) -> Duration {
        self.load_time + self.preprocess_time + self.training_time + self.save_time
    }

    pub fn reduction_pct(&self) -> f64 {
        if self.initial_features == 0 {
            return 0.0;
        }
        self.initial_features.saturating_sub(self.final_features) as f64 / self.initial_features as f64 * 100.0
    }

    fn stages(&self) -> [(&'static str, &[String]); 4] {
        [
            ("High Missing Values", self.dropped_missing.as_slice()),
            ("Identifier Columns", self.dropped_identifiers.as_slice()),
            ("Near-Zero Variance", self.dropped_variance.as_slice()),
            ("High Correlation", self.dropped_correlation.as_slice()),
        ]
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Initial Features"), Cell::new(self.initial_features)]);
        for (name, dropped) in self.stages() {
            table.add_row(vec![
                Cell::new(format!("🗑️  Dropped ({})", name)),
                Cell::new(dropped.len()).fg(if dropped.is_empty() { Color::White } else { Color::Red }),
            ]);
        }
        table.add_row(vec![
            Cell::new("✅ Final Features"),
            Cell::new(self.final_features)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);

        let reduction_pct = self.reduction_pct();
        let color = if reduction_pct > 30.0 {
            Color::Green
        } else if reduction_pct > 10.0 {
            Color::Yellow
        } else {
            Color::Cyan
        };
        table.add_row(vec![
            Cell::new("📉 Reduction"),
            Cell::new(format!("{:.1}%", reduction_pct))
                .fg(color)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("⏱️  Total Time"),
            Cell::new(format!("{:.2}s", self.total_time().as_secs_f64())),
        ]);

        table
    }

    pub fn display(&self) {
        print_section_title("📋", "REDUCTION SUMMARY");
        print_indented(&self.table());

        if self.stages().iter().all(|(_, dropped)| dropped.is_empty()) {
            return;
        }

        print_section_title("📝", "DROPPED FEATURES");
        for (name, dropped) in self.stages() {
            if dropped.is_empty() {
                continue;
            }
            println!();
            println!(
                "      {} {}:",
                style(name).yellow(),
                style(format!("({})", dropped.len())).dim()
            );
            for feature in dropped {
                println!("        {} {}", style("•").dim(), feature);
            }
        }
    }
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

/// One row per strategy: accuracy, error, kappa, training time, status.
pub fn model_comparison_table(candidates: &[CandidateReport]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Strategy").add_attribute(Attribute::Bold),
        Cell::new("Test Accuracy").add_attribute(Attribute::Bold),
        Cell::new("Error Rate").add_attribute(Attribute::Bold),
        Cell::new("Kappa").add_attribute(Attribute::Bold),
        Cell::new("Train Time").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
    ]);

    for c in candidates {
        let status = match (&c.error, c.selected) {
            (Some(e), _) => Cell::new(format!("failed: {}", e)).fg(Color::Red),
            (None, true) => Cell::new("★ selected")
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
            (None, false) => Cell::new("ok"),
        };
        table.add_row(vec![
            Cell::new(c.strategy.label()),
            Cell::new(percent(c.test_accuracy)).set_alignment(CellAlignment::Right),
            Cell::new(percent(c.test_accuracy.map(|a| 1.0 - a))).set_alignment(CellAlignment::Right),
            Cell::new(ratio(c.test_kappa)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}s", c.training_time.as_secs_f64())).set_alignment(CellAlignment::Right),
            status,
        ]);
    }

    table
}

/// Counts with true classes as rows and predicted classes as columns.
pub fn confusion_table(matrix: &ConfusionMatrix) -> Table {
    let classes = matrix.classes();
    let show_unknown = matrix.unknown_total() > 0;

    let mut header = vec![Cell::new("true \\ predicted").add_attribute(Attribute::Bold)];
    header.extend(classes.iter().map(|c| Cell::new(c).add_attribute(Attribute::Bold)));
    if show_unknown {
        header.push(Cell::new("(unknown)").add_attribute(Attribute::Bold));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header);

    for (i, class) in classes.iter().enumerate() {
        let mut row = vec![Cell::new(class).add_attribute(Attribute::Bold)];
        for j in 0..classes.len() {
            let cell = Cell::new(matrix.count(i, j)).set_alignment(CellAlignment::Right);
            row.push(if i == j { cell.fg(Color::Green) } else { cell });
        }
        if show_unknown {
            row.push(Cell::new(matrix.unknown(i)).fg(Color::Red));
        }
        table.add_row(row);
    }

    table
}

/// Per-class sensitivity, specificity, precision and balanced accuracy.
pub fn class_metrics_table(matrix: &ConfusionMatrix) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Class").add_attribute(Attribute::Bold),
        Cell::new("Support").add_attribute(Attribute::Bold),
        Cell::new("Sensitivity").add_attribute(Attribute::Bold),
        Cell::new("Specificity").add_attribute(Attribute::Bold),
        Cell::new("Precision").add_attribute(Attribute::Bold),
        Cell::new("Balanced Acc.").add_attribute(Attribute::Bold),
    ]);

    for m in matrix.class_metrics() {
        table.add_row(vec![
            Cell::new(&m.class),
            Cell::new(m.support).set_alignment(CellAlignment::Right),
            Cell::new(ratio(m.sensitivity)).set_alignment(CellAlignment::Right),
            Cell::new(ratio(m.specificity)).set_alignment(CellAlignment::Right),
            Cell::new(ratio(m.precision)).set_alignment(CellAlignment::Right),
            Cell::new(ratio(m.balanced_accuracy)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

/// Column profile: missing ratio, mean, standard deviation.
pub fn profile_table(stats: &[ColumnStatistics]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Column").add_attribute(Attribute::Bold),
        Cell::new("Missing").add_attribute(Attribute::Bold),
        Cell::new("Mean").add_attribute(Attribute::Bold),
        Cell::new("Std Dev").add_attribute(Attribute::Bold),
    ]);

    for s in stats {
        let missing = Cell::new(format!("{:.1}%", s.missing_ratio * 100.0)).set_alignment(CellAlignment::Right);
        table.add_row(vec![
            Cell::new(&s.name),
            if s.missing_ratio > 0.0 { missing.fg(Color::Yellow) } else { missing },
            Cell::new(ratio(s.mean)).set_alignment(CellAlignment::Right),
            Cell::new(ratio(s.std_dev)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

pub fn print_section_title(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

/// Print a table indented to line up with the step output.
pub fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}
