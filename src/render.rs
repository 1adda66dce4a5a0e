use crate::tracker::catalog::Catalog;
use crate::tracker::log::LogEntry;
use crate::tracker::recap::RecapRow;

const BAR: char = '█';

pub fn render_catalog(catalog: &Catalog) -> String {
    if catalog.is_empty() {
        return "- No activities".to_string();
    }

    let width = column_width(catalog.entries().iter().map(|entry| entry.name.as_str()), 8);
    let rows = catalog
        .entries()
        .iter()
        .map(|entry| format!("| {:<width$} | {:>6} |", entry.name, entry.points))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "| {:<width$} | {:>6} |\n|{}|--------|\n{}",
        "Activity",
        "Points",
        "-".repeat(width + 2),
        rows
    )
}

pub fn render_log(entries: &[&LogEntry]) -> String {
    if entries.is_empty() {
        return "- No log entries".to_string();
    }

    let width = column_width(entries.iter().map(|entry| entry.activity.as_str()), 8);
    let rows = entries
        .iter()
        .map(|entry| {
            format!(
                "| {:>7} | {} | {:<width$} | {:>5} | {:<8} |",
                entry.id.to_string(),
                entry.date.format("%Y-%m-%d"),
                entry.activity,
                entry.points,
                entry.approval.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "| {:>7} | {:<10} | {:<width$} | {:>5} | {:<8} |\n|---------|------------|{}|-------|----------|\n{}",
        "No",
        "Date",
        "Activity",
        "Point",
        "Approval",
        "-".repeat(width + 2),
        rows
    )
}

pub fn render_recap(recap: &[RecapRow], chart_width: usize) -> String {
    if recap.is_empty() {
        return "- No recap yet".to_string();
    }

    let table = recap
        .iter()
        .map(|row| {
            format!(
                "| {:>3} | {} | {:>11} |",
                row.no,
                row.date.format("%Y-%m-%d"),
                row.total_points
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "| {:>3} | {:<10} | {:>11} |\n|-----|------------|-------------|\n{}\n\n{}",
        "No",
        "Date",
        "Rekap Point",
        table,
        render_chart(recap, chart_width)
    )
}

/// Horizontal bars scaled to the largest daily total. Non-positive totals
/// get an empty bar.
pub fn render_chart(recap: &[RecapRow], chart_width: usize) -> String {
    let max_total = recap
        .iter()
        .map(|row| row.total_points)
        .max()
        .unwrap_or_default()
        .max(1);

    recap
        .iter()
        .map(|row| {
            let length = (row.total_points.max(0) as usize * chart_width) / max_total as usize;
            format!(
                "{} {} {}",
                row.date.format("%Y-%m-%d"),
                BAR.to_string().repeat(length),
                row.total_points
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, minimum: usize) -> usize {
    values
        .map(|value| value.chars().count())
        .max()
        .unwrap_or_default()
        .max(minimum)
}

#[cfg(test)]
mod tests {
    use super::{render_chart, render_log};
    use crate::tracker::log::{Approval, EntryId, LogEntry};
    use crate::tracker::recap::RecapRow;
    use chrono::NaiveDate;

    fn recap_row(day: u32, total_points: i64) -> RecapRow {
        RecapRow {
            no: i64::from(day),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            total_points,
        }
    }

    #[test]
    fn chart_scales_to_the_largest_day() {
        let chart = render_chart(&[recap_row(1, 5), recap_row(2, 10), recap_row(3, -2)], 10);
        let lines = chart.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "2024-01-01 █████ 5");
        assert_eq!(lines[1], "2024-01-02 ██████████ 10");
        assert_eq!(lines[2], "2024-01-03  -2");
    }

    #[test]
    fn pending_entries_are_labelled() {
        let entry = LogEntry {
            id: EntryId::Pending,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            activity: "Reading".to_string(),
            points: 5,
            approval: Approval::NotGood,
        };

        let rendered = render_log(&[&entry]);

        assert!(rendered.contains("| pending | 2024-01-01 | Reading  |     5 | Not Good |"));
    }
}
