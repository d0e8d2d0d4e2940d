//! Dashboard rendering over the history query interface

/// Hourly aggregation
pub mod buckets;
/// Server-side HTML
pub mod render;

pub use buckets::{hourly_bars, monitor_bars, Cell, HourBar, TimeRange, MAX_BARS};
pub use render::{escape_html, render_dashboard, render_login, DashboardRow};
