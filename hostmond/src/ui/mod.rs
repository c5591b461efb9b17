//! Embedded dashboard page
//!
//! Polls `/metrics` into a table and reloads `/chart.svg`. Cells over the
//! configured alert thresholds are highlighted with the same strict `>` the
//! alert engine uses.

use crate::alerts::Thresholds;
use axum::response::Html;

const TEMPLATE: &str = include_str!("dashboard.html");

pub fn render(thresholds: &Thresholds) -> Html<String> {
    Html(
        TEMPLATE
            .replace("{{cpu_percent}}", &thresholds.cpu_percent.to_string())
            .replace("{{memory_percent}}", &thresholds.memory_percent.to_string())
            .replace("{{disk_mb}}", &thresholds.disk_mb.to_string())
            .replace("{{network_mb}}", &thresholds.network_mb.to_string()),
    )
}
