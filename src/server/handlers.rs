use crate::dashboard::{monitor_bars, render_dashboard, DashboardRow, HourBar, TimeRange};
use crate::history::{HourBucket, LogQuery, Order};
use crate::records::{LogEntry, Monitor, SweepResult, TriggerSource};
use crate::server::{AppError, AppState};
use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// Treat empty query values like missing ones
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_param<T: FromStr>(field: &str, value: Option<String>) -> Result<Option<T>, AppError> {
    present(value)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| AppError::InvalidInput(format!("{} must be an integer, got '{}'", field, raw)))
        })
        .transpose()
}

/// Raw `/log` parameters, validated by [`LogParams::into_query`]
#[derive(Debug, Default, Deserialize)]
pub struct LogParams {
    pub name: Option<String>,
    pub time: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<String>,
    pub order: Option<String>,
}

impl LogParams {
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for malformed numbers, bucket tokens
    /// or orderings.
    pub fn into_query(self, state: &AppState) -> Result<LogQuery, AppError> {
        let bucket = present(self.time)
            .map(|token| HourBucket::parse(&token, state.offset))
            .transpose()
            .map_err(AppError::InvalidInput)?;

        let order = match present(self.order).as_deref() {
            None => None,
            Some("asc") => Some(Order::Asc),
            Some("desc") => Some(Order::Desc),
            Some(other) => {
                return Err(AppError::InvalidInput(format!(
                    "order must be 'asc' or 'desc', got '{}'",
                    other
                )))
            }
        };

        Ok(LogQuery {
            name: present(self.name),
            bucket,
            from: parse_param("from", self.from)?,
            to: parse_param("to", self.to)?,
            limit: parse_param("limit", self.limit)?.unwrap_or(0),
            order,
        })
    }
}

/// `GET /log`
pub async fn log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogParams>,
) -> Result<Json<Vec<LogEntry>>, AppError> {
    let query = params.into_query(&state)?.resolve(state.clock.now());
    let records = state.orchestrator.store().query(&query).await?;
    Ok(Json(records.into_iter().map(LogEntry::from).collect()))
}

/// `GET /check`: run a manual sweep and return its results
pub async fn check(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SweepResult>>, AppError> {
    let results = state.orchestrator.run_sweep(TriggerSource::Manual).await?;
    Ok(Json(results))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub name: Option<String>,
    pub range: Option<String>,
}

impl RangeParams {
    fn range(&self) -> Result<TimeRange, AppError> {
        match self.range.as_deref().filter(|r| !r.is_empty()) {
            Some(raw) => raw.parse().map_err(AppError::InvalidInput),
            None => Ok(TimeRange::default()),
        }
    }
}

/// Bars of one monitor, as returned by `/buckets`
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitorBars {
    pub name: String,
    pub bars: Vec<HourBar>,
}

/// `GET /buckets`: hourly bars for one monitor, or for every configured one
pub async fn buckets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<MonitorBars>>, AppError> {
    let range = params.range()?;
    let names = match present(params.name) {
        Some(name) => vec![name],
        None => state
            .orchestrator
            .source()
            .load()?
            .into_iter()
            .map(|m| m.name)
            .collect(),
    };

    let now = state.clock.now();
    let store = state.orchestrator.store();
    let mut result = Vec::with_capacity(names.len());
    for name in names {
        let bars = monitor_bars(store.as_ref(), &name, range, now, state.offset).await?;
        result.push(MonitorBars { name, bars });
    }
    Ok(Json(result))
}

/// `GET /`
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Html<String>, AppError> {
    let range = params.range()?;
    let monitors = state.orchestrator.source().load()?;
    let now = state.clock.now();
    let store = state.orchestrator.store();

    let mut rows = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        let bars = monitor_bars(store.as_ref(), &monitor.name, range, now, state.offset)
            .await
            .map_err(|e| {
                warn!("Dashboard could not load history for {}: {}", monitor.name, e);
                e.to_string()
            });
        rows.push(DashboardRow { monitor, bars });
    }

    Ok(Html(render_dashboard(&rows, range)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationInfo {
    pub sink: String,
    pub configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Info {
    pub version: String,
    pub monitor_source: String,
    pub monitors: Vec<Monitor>,
    pub notifications: NotificationInfo,
    pub utc_offset_hours: i32,
    pub auth_enabled: bool,
}

/// `GET /info`
pub async fn info(State(state): State<Arc<AppState>>) -> Result<Json<Info>, AppError> {
    let source = state.orchestrator.source();
    let notifier = state.orchestrator.notifier();

    Ok(Json(Info {
        version: env!("CARGO_PKG_VERSION").to_string(),
        monitor_source: source.describe(),
        monitors: source.load()?,
        notifications: NotificationInfo {
            sink: notifier.sink_name().to_string(),
            configured: notifier.sink_configured(),
        },
        utc_offset_hours: state.offset.local_minus_utc() / 3600,
        auth_enabled: state.auth_enabled(),
    }))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheck {
    pub name: String,
    pub ok: bool,
    pub details: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReport {
    /// "ok" when every check passed, "degraded" otherwise
    pub status: String,
    pub checks: Vec<HealthCheck>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub suggestions: BTreeMap<String, String>,
}

/// `GET /health`: self-check with remediation hints
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let source = state.orchestrator.source();
    let notifier = state.orchestrator.notifier();
    let mut checks = Vec::new();
    let mut suggestions = BTreeMap::new();

    match source.load() {
        Ok(monitors) => checks.push(HealthCheck {
            name: "monitors".to_string(),
            ok: true,
            details: format!("{} monitors from {}", monitors.len(), source.describe()),
        }),
        Err(e) => {
            checks.push(HealthCheck {
                name: "monitors".to_string(),
                ok: false,
                details: e.to_string(),
            });
            suggestions.insert(
                "monitors".to_string(),
                "Provide a JSON array such as [{\"name\":\"example\",\"url\":\"https://example.com\"}] \
                 via MONITOR_CONFIG_JSON, monitors_file or [[monitors]] tables"
                    .to_string(),
            );
        }
    }

    match state.orchestrator.store().ping().await {
        Ok(()) => checks.push(HealthCheck {
            name: "history".to_string(),
            ok: true,
            details: "reachable".to_string(),
        }),
        Err(e) => {
            checks.push(HealthCheck {
                name: "history".to_string(),
                ok: false,
                details: e.to_string(),
            });
            suggestions.insert(
                "history".to_string(),
                "Check that [storage] path points to a writable location".to_string(),
            );
        }
    }

    let configured = notifier.sink_configured();
    checks.push(HealthCheck {
        name: "notifications".to_string(),
        ok: configured,
        details: format!(
            "{} sink {}",
            notifier.sink_name(),
            if configured { "configured" } else { "not configured" }
        ),
    });
    if !configured {
        suggestions.insert(
            "notifications".to_string(),
            "Set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID, or [notify.telegram] bot_token and chat_id"
                .to_string(),
        );
    }

    let status = if checks.iter().all(|c| c.ok) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthReport {
        status: status.to_string(),
        checks,
        suggestions,
    })
}
