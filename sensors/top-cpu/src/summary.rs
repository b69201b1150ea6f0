//! Reporting-period summary and its bar rendering.

use cpuhog_core::format;
use serde::Serialize;

/// Minimum column width of each percentage figure.
pub const FIGURE_WIDTH: usize = 4;

/// The command that used the most CPU in a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCommand {
    /// Command name as reported by the sampler
    pub name: String,
    /// Summed usage over all its processes, normalized by core count
    pub summed_cpu_percent: f64,
    /// Number of readings that contributed
    pub process_count: usize,
}

impl TopCommand {
    /// Seed value that any positive reading replaces.
    pub(crate) fn placeholder() -> Self {
        Self {
            name: "?".to_owned(),
            summed_cpu_percent: 0.0,
            process_count: 0,
        }
    }
}

/// Totals for one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    /// Machine-wide usage, normalized by core count
    pub total_cpu_percent: f64,
    /// Heaviest command
    pub top: TopCommand,
}

impl PeriodSummary {
    /// Render the bar line, or an empty string when the total is below
    /// `threshold`.
    ///
    /// ```rust
    /// use cpuhog_top_cpu::{PeriodSummary, TopCommand};
    ///
    /// let summary = PeriodSummary {
    ///     total_cpu_percent: 4.0,
    ///     top: TopCommand { name: "node".into(), summed_cpu_percent: 3.0, process_count: 1 },
    /// };
    /// assert_eq!(summary.render(0.0, 12), "        node    3% /   4%");
    /// assert_eq!(summary.render(5.0, 12), "");
    /// ```
    #[must_use]
    pub fn render(&self, threshold: f64, label_width: usize) -> String {
        if self.total_cpu_percent < threshold {
            return String::new();
        }

        let suffix = format::count_suffix(self.top.process_count);
        let label = format::fit_label(&self.top.name, &suffix, label_width);

        format!(
            "{label:>label_width$} {}% /{}%",
            format::percent_field(self.top.summed_cpu_percent, FIGURE_WIDTH),
            format::percent_field(self.total_cpu_percent, FIGURE_WIDTH),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str, top: f64, count: usize, total: f64) -> PeriodSummary {
        PeriodSummary {
            total_cpu_percent: total,
            top: TopCommand {
                name: name.to_owned(),
                summed_cpu_percent: top,
                process_count: count,
            },
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(summary("node", 10.0, 1, 15.0).render(20.0, 12), "");
        assert_eq!(
            summary("node", 10.0, 1, 20.0).render(20.0, 12),
            "        node   10% /  20%"
        );
    }

    #[test]
    fn test_process_count_suffix() {
        assert_eq!(
            summary("firefox", 42.4, 6, 61.5).render(0.0, 12),
            "   firefox*6   42% /  62%"
        );
    }

    #[test]
    fn test_long_name_truncated_to_budget() {
        let line = summary("chromium-browser-stable", 12.0, 14, 30.0).render(0.0, 12);
        let label = &line[..12];
        assert_eq!(label, "chromium-*14");
        assert_eq!(line, "chromium-*14   12% /  30%");

        let line = summary("chromium-browser-stable", 12.0, 1, 30.0).render(0.0, 12);
        assert!(line.starts_with("chromium-bro "));
    }

    #[test]
    fn test_wide_figures_are_not_cut() {
        assert_eq!(
            summary("stress", 12800.0, 128, 12800.0).render(0.0, 12),
            "  stress*128 12800% /12800%"
        );
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(
            summary("make", 2.5, 1, 7.5).render(0.0, 12),
            "        make    3% /   8%"
        );
    }

    #[test]
    fn test_custom_label_width() {
        assert_eq!(
            summary("cargo", 1.0, 3, 1.0).render(0.0, 4),
            "ca*3    1% /   1%"
        );
    }
}
