use crate::dashboard::buckets::{HourBar, TimeRange};
use crate::records::Monitor;
use reqwest::Url;

/// One dashboard row: a monitor and its bars, or the reason they are missing
pub struct DashboardRow {
    pub monitor: Monitor,
    pub bars: Result<Vec<HourBar>, String>,
}

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; padding: 1rem; background: #f0f4f8; color: #333; margin: 0 auto; max-width: 1000px; }
table { width: 100%; border-collapse: collapse; background: #fff; border-radius: 8px; }
th, td { padding: 0.75rem 1rem; text-align: left; border-bottom: 1px solid #e2e8f0; vertical-align: middle; }
a { color: #2563eb; text-decoration: none; }
.status-bar { display: flex; flex-wrap: wrap; gap: 3px; }
.bar { display: block; width: 10px; height: 16px; border-radius: 3px; background-color: #d1d5db; }
.bar.ok { background-color: #22c55e; }
.bar.fail { background-color: #ef4444; }
.error { color: #ef4444; }
"#;

/// Escape text for use in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Link to the log query for one monitor and one hour
fn log_link(name: &str, hour: &str) -> String {
    let mut url = match Url::parse("http://localhost/log") {
        Ok(url) => url,
        Err(_) => return "/log".to_string(),
    };
    url.query_pairs_mut()
        .append_pair("name", name)
        .append_pair("time", hour);
    format!("/log?{}", url.query().unwrap_or_default())
}

fn render_bars(name: &str, bars: &[HourBar]) -> String {
    let mut html = String::from(r#"<div class="status-bar">"#);
    for bar in bars {
        html.push_str(&format!(
            r#"<a class="bar {}" href="{}" title="{}: {} checks"></a>"#,
            bar.cell.as_str(),
            escape_html(&log_link(name, &bar.hour)),
            escape_html(&bar.hour),
            bar.checks
        ));
    }
    html.push_str("</div>");
    html
}

/// Render the status page
///
/// # Arguments
///
/// * `rows` - Monitors in configuration order with their bars
/// * `range` - Selected range, highlighted in the selector
pub fn render_dashboard(rows: &[DashboardRow], range: TimeRange) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\" />\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />\n");
    html.push_str("<title>Uptime status</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<h1>📊 Uptime status</h1>\n<nav>");

    for choice in TimeRange::CHOICES {
        if choice == range {
            html.push_str(&format!("<strong>{}</strong> ", choice.label()));
        } else {
            html.push_str(&format!(
                r#"<a href="/?range={}">{}</a> "#,
                choice,
                choice.label()
            ));
        }
    }

    html.push_str("</nav>\n<table>\n<thead><tr><th>Site</th><th>Status by hour</th></tr></thead>\n<tbody>\n");
    for row in rows {
        let cells = match row.bars {
            Ok(ref bars) => render_bars(&row.monitor.name, bars),
            Err(ref e) => format!(r#"<span class="error">{}</span>"#, escape_html(e)),
        };
        html.push_str(&format!(
            "<tr><td><a href=\"{}\" target=\"_blank\">{}</a></td><td>{}</td></tr>\n",
            escape_html(&row.monitor.url),
            escape_html(&row.monitor.name),
            cells
        ));
    }
    if rows.is_empty() {
        html.push_str("<tr><td colspan=\"2\">No monitors configured</td></tr>\n");
    }
    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

/// Render the login form, with an optional error message
pub fn render_login(message: Option<&str>) -> String {
    let error = message
        .map(|m| format!(r#"<div class="error">{}</div>"#, escape_html(m)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8" />
<title>Sign in</title>
<style>{}</style>
</head>
<body>
<h2>Sign in</h2>
{}
<form method="POST" action="/login">
<label for="password">Password</label>
<input type="password" id="password" name="password" required />
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#,
        STYLE, error
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::buckets::Cell;

    fn bar(hour: &str, cell: Cell) -> HourBar {
        HourBar {
            hour: hour.to_string(),
            start: 0,
            cell,
            checks: 1,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_log_link_is_encoded() {
        assert_eq!(
            log_link("site a&b", "2024-03-01 13"),
            "/log?name=site+a%26b&time=2024-03-01+13"
        );
    }

    #[test]
    fn test_dashboard_lists_monitors_and_bars() {
        let rows = vec![
            DashboardRow {
                monitor: Monitor::new("site-a", "https://site-a.example"),
                bars: Ok(vec![bar("2024-03-01 12", Cell::Ok), bar("2024-03-01 13", Cell::Fail)]),
            },
            DashboardRow {
                monitor: Monitor::new("<b>", "https://b.example"),
                bars: Err("history unavailable".to_string()),
            },
        ];

        let html = render_dashboard(&rows, TimeRange::Hours(168));

        assert!(html.contains("https://site-a.example"));
        assert!(html.contains(r#"class="bar ok""#));
        assert!(html.contains(r#"class="bar fail""#));
        assert!(html.contains("/log?name=site-a&amp;time=2024-03-01+13"));
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("history unavailable"));
        assert!(html.contains("<strong>Last 7 days</strong>"));
        assert!(html.contains(r#"href="/?range=all""#));
    }

    #[test]
    fn test_login_page_shows_error() {
        assert!(render_login(Some("Wrong password")).contains("Wrong password"));
        assert!(!render_login(None).contains(r#"class="error""#));
    }
}
