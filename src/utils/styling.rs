//! Terminal styling utilities

use std::path::Path;
use std::time::Duration;

use console::{style, Emoji};

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static LINK: Emoji<'_, '_> = Emoji("🔗 ", "");
pub static DICE: Emoji<'_, '_> = Emoji("🎲 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
     _   _    _    ____  ____  _____ _
    | | | |  / \  |  _ \/ ___|| ____| |
    | |_| | / _ \ | |_) \___ \|  _| | |
    |  _  |/ ___ \|  _ < ___) | |___| |___
    |_| |_/_/   \_\_| \_\____/|_____|_____|
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Feature selection and cross-validated model choice").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Values shown on the configuration card
pub struct ConfigCard<'a> {
    pub input: &'a Path,
    pub cases: Option<&'a Path>,
    pub label: &'a str,
    pub output: Option<&'a Path>,
    pub missing_threshold: f64,
    pub correlation_cutoff: f64,
    pub seed: u64,
    pub strategies: &'a [String],
}

/// Print configuration card
pub fn print_config(card: &ConfigCard<'_>) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);
    let none = "-".to_string();

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Train:  {:<39}│", FOLDER, truncate_path(card.input, 38));
    println!(
        "    │  {} Cases:  {:<39}│",
        FOLDER,
        card.cases.map_or(none.clone(), |p| truncate_path(p, 38))
    );
    println!("    │  {} Label:  {:<39}│", TARGET, truncate_string(card.label, 38));
    println!(
        "    │  {} Output: {:<39}│",
        SAVE,
        card.output.map_or(none, |p| truncate_path(p, 38))
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Missing threshold:     {:<24}│",
        CHART,
        style(format!("{:.1}%", card.missing_threshold * 100.0)).yellow()
    );
    println!(
        "    │  {} Correlation cutoff:    {:<24}│",
        LINK,
        style(format!("{:.2}", card.correlation_cutoff)).yellow()
    );
    println!(
        "    │  {} Seed:                  {:<24}│",
        DICE,
        style(card.seed).yellow()
    );
    println!(
        "    │  {} Strategies:            {:<24}│",
        ROCKET,
        style(truncate_string(&card.strategies.join(", "), 24)).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!("    {} {}", ROCKET, style("Harsel run complete!").green().bold());
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, threshold_info: Option<&str>) {
    match threshold_info {
        Some(info) => println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        ),
        None => println!("      Found {} {}", style(count).yellow().bold(), description),
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

/// Keep the tail of `s` so it fits in `max_len` characters.
fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("/very/long/path/train.csv", 12), "...train.csv");
    }
}
