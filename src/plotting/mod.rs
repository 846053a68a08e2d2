use anyhow::Result;
use polars::prelude::DataFrame;
use textplots::{Chart, Plot, Shape};

use crate::loader::{COL_GENDER, COL_HOUR, COL_USER_TYPE};
use crate::stats::{category_counts, numeric_counts};

/// Terminal bar charts for the current result set.
pub struct TripPlotter {
    width: usize,
    height: usize,
}

impl TripPlotter {
    pub fn new() -> Self {
        let (width, height) = optimal_dimensions();
        Self { width, height }
    }

    /// Render every chart: user types, gender (when the frame exposes a
    /// gender column), and trips per start hour.
    pub fn render_all(&self, df: &DataFrame) -> Result<String> {
        let mut output = String::new();
        output.push_str(&self.bar_chart(
            "Number of users per type",
            "user type",
            &category_counts(df, COL_USER_TYPE)?,
        ));
        if df.get_column_names().contains(&COL_GENDER) {
            output.push_str(&self.bar_chart(
                "Number of users per gender",
                "gender",
                &category_counts(df, COL_GENDER)?,
            ));
        } else {
            output.push_str("\nThis dataset has no gender column; skipping the gender chart.\n");
        }
        output.push_str(&self.hour_chart(df)?);
        Ok(output)
    }

    /// Horizontal bar chart of category counts, one `█` bar per category.
    fn bar_chart(&self, title: &str, axis_label: &str, counts: &[(String, i64)]) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n📊 {}\n", title));
        output.push_str(&format!("   y: {} | x: number of users\n", axis_label));
        if counts.is_empty() {
            output.push_str("   No data to plot.\n");
            return output;
        }
        let max_count = counts.iter().map(|(_, n)| *n).max().unwrap_or(1).max(1);
        let label_width = counts.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let bar_space = self.width.saturating_sub(label_width + 12).max(10);
        for (label, count) in counts {
            let bar_length = ((count * bar_space as i64) / max_count).max(1) as usize;
            output.push_str(&format!(
                "   {:<label_width$} {} ({})\n",
                label,
                "█".repeat(bar_length),
                count
            ));
        }
        output
    }

    /// Trip counts by start hour on a 0-23 axis.
    fn hour_chart(&self, df: &DataFrame) -> Result<String> {
        let mut output = String::from("\n📊 Trips per start hour\n");
        let counts = numeric_counts(df, COL_HOUR)?;
        if counts.is_empty() {
            output.push_str("   No data to plot.\n");
            return Ok(output);
        }
        let mut points: Vec<(f32, f32)> = (0..24).map(|hour| (hour as f32, 0.0)).collect();
        for (hour, trips) in counts {
            if let Some(point) = points.get_mut(hour as usize) {
                point.1 = trips as f32;
            }
        }
        output.push_str("   y: number of trips | x: hour of day\n");
        let chart = Chart::new(self.width as u32, self.height as u32, 0.0, 23.0)
            .lineplot(&Shape::Bars(&points))
            .to_string();
        output.push_str(&chart);
        output.push('\n');
        Ok(output)
    }
}

impl Default for TripPlotter {
    fn default() -> Self {
        Self::new()
    }
}

/// Chart dimensions from the terminal size, with sane fallbacks.
fn optimal_dimensions() -> (usize, usize) {
    match crossterm::terminal::size() {
        Ok((cols, rows)) => {
            let width = (cols as usize).min(120).max(60);
            let height = (rows as usize / 3).min(30).max(15);
            (width, height)
        }
        Err(_) => (80, 20),
    }
}
