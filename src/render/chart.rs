use crate::domain::ChartSpec;

/// Maps values onto bar heights. Negative values draw as empty bars.
#[derive(Debug, Clone, Copy)]
pub struct ChartScale {
    max: f64,
}

impl ChartScale {
    pub fn for_chart(chart: &ChartSpec) -> Self {
        let max = chart.max_value();
        Self {
            max: if max > 0.0 { max } else { 1.0 },
        }
    }

    pub fn fraction(&self, value: f64) -> f64 {
        (value.max(0.0) / self.max).clamp(0.0, 1.0)
    }
}

/// Whole numbers without decimals, otherwise two decimals with a German
/// decimal comma.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        let formatted = format!("{:.2}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        trimmed.replace('.', ",")
    }
}

/// Horizontal bar chart for terminal output.
pub fn render_terminal(chart: &ChartSpec, width: usize) -> String {
    let scale = ChartScale::for_chart(chart);
    let label_width = chart
        .data
        .iter()
        .map(|point| point.category.chars().count())
        .max()
        .unwrap_or(0);
    let bar_width = width.saturating_sub(label_width + 16).max(10);

    let mut out = format!("{}\n({})\n", chart.title, chart.ylabel);
    for point in &chart.data {
        let filled = (scale.fraction(point.value) * bar_width as f64).round() as usize;
        let padding = label_width - point.category.chars().count();
        out.push_str(&format!(
            "{}{} │{} {}\n",
            point.category,
            " ".repeat(padding),
            "█".repeat(filled),
            format_value(point.value)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_values() {
        assert_eq!(format_value(15000.0), "15000");
        assert_eq!(format_value(12.5), "12,5");
        assert_eq!(format_value(0.126), "0,13");
        assert_eq!(format_value(-3.0), "-3");
    }

    #[test]
    fn scale_handles_degenerate_charts() {
        let chart = ChartSpec::new("t", "y").with_point("a", 0.0).with_point("b", -5.0);
        let scale = ChartScale::for_chart(&chart);
        assert_eq!(scale.fraction(0.0), 0.0);
        assert_eq!(scale.fraction(-5.0), 0.0);
    }

    #[test]
    fn terminal_chart_keeps_order_and_proportions() {
        let chart = ChartSpec::new("Aktueller Energieverbrauch", "kWh/Jahr")
            .with_point("Strom", 3000.0)
            .with_point("Gas", 9000.0);
        let rendered = render_terminal(&chart, 60);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Aktueller Energieverbrauch");
        assert_eq!(lines[1], "(kWh/Jahr)");
        assert!(lines[2].starts_with("Strom │"));
        assert!(lines[3].starts_with("Gas   │"));
        let strom = lines[2].matches('█').count();
        let gas = lines[3].matches('█').count();
        assert_eq!(gas, 60 - 5 - 16);
        assert_eq!(strom, (gas as f64 / 3.0).round() as usize);
    }
}
