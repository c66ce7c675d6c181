//! Chart axis resolution and KPI summary over a result table.

use crate::error::Result;
use crate::plan::{ChartType, QueryPlan};
use polars::prelude::*;
use serde::Serialize;

pub const MAX_KPIS: usize = 3;

/// Chart hint resolved against the columns that actually came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: String,
}

/// Pick chart axes. A missing x falls back to the first column; a missing y (or one equal
/// to x) falls back to the first numeric column, else the last column.
pub fn resolve_axes(df: &DataFrame, x_col: &str, y_col: &str) -> Option<(String, String)> {
    let columns = df.get_column_names();
    let first = *columns.first()?;

    let x = if columns.contains(&x_col) { x_col } else { first };
    let y = if columns.contains(&y_col) && y_col != x {
        y_col
    } else {
        df.get_columns()
            .iter()
            .find(|s| s.dtype().is_numeric())
            .map(|s| s.name())
            .or_else(|| columns.last().copied())?
    };

    Some((x.to_string(), y.to_string()))
}

pub fn chart_spec(plan: &QueryPlan, df: &DataFrame) -> Option<ChartSpec> {
    if df.height() == 0 {
        return None;
    }
    let (x, y) = resolve_axes(df, &plan.x_col, &plan.y_col)?;
    Some(ChartSpec {
        chart_type: plan.chart_type,
        x,
        y,
    })
}

/// Row count plus the totals of the first two numeric columns.
pub fn compute_kpis(df: &DataFrame) -> Result<Vec<Kpi>> {
    let mut kpis = vec![Kpi {
        label: "Records".to_string(),
        value: group_thousands(&df.height().to_string()),
    }];

    for series in df.get_columns().iter().filter(|s| s.dtype().is_numeric()).take(2) {
        let total = series.cast(&DataType::Float64)?.f64()?.sum().unwrap_or(0.0);
        kpis.push(Kpi {
            label: title_case(series.name()),
            value: format_whole(total),
        });
    }

    kpis.truncate(MAX_KPIS);
    Ok(kpis)
}

/// "avg_days_in_stage" -> "Avg Days In Stage"
pub fn title_case(column: &str) -> String {
    column
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Round to a whole number and group thousands: 9690000.4 -> "9,690,000".
pub fn format_whole(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let grouped = group_thousands(&digits);
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
