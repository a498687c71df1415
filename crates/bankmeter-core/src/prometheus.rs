//! Prometheus text exposition (format 0.0.4).
//!
//! Meter names are dotted (`bank.transfer`) and rendered with underscores.
//! Counters get a `_total` suffix. Timers are rendered in seconds as a
//! summary (`_count`, `_sum`) or, when buckets are enabled, a histogram, plus
//! a separate `_max` gauge family.

use std::fmt::Write;
use std::time::Duration;

use crate::meter::{MeterKind, MeterSnapshot, MeterValue, TimerSnapshot};
use crate::tags::Tags;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// `bank.transfer-out` -> `bank_transfer_out`
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Exposition family name for a meter name of the given kind.
pub fn family_name(name: &str, kind: MeterKind) -> String {
    let base = sanitize_name(name);
    match kind {
        MeterKind::Counter if base.ends_with("_total") => base,
        MeterKind::Counter => format!("{base}_total"),
        MeterKind::Gauge => base,
        MeterKind::Timer => format!("{base}_seconds"),
    }
}

/// Every sample name a meter name of the given kind can emit. Two meter
/// names must never share one of these.
pub fn exposed_names(name: &str, kind: MeterKind) -> Vec<String> {
    let family = family_name(name, kind);
    match kind {
        MeterKind::Counter | MeterKind::Gauge => vec![family],
        MeterKind::Timer => vec![
            format!("{family}_bucket"),
            format!("{family}_count"),
            format!("{family}_sum"),
            format!("{family}_max"),
            family,
        ],
    }
}

/// Tag keys are valid label names already (see `tags::validate_key`).
fn label_str(tags: &Tags, extra: Option<(&str, &str)>) -> String {
    let mut parts: Vec<String> = tags
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect();
    if let Some((k, v)) = extra {
        parts.push(format!("{}=\"{}\"", k, escape_label(v)));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

fn seconds(d: Duration) -> String {
    format!("{}", d.as_secs_f64())
}

/// Render snapshots (sorted by identity) into exposition text.
pub fn render<F>(snapshots: &[MeterSnapshot], describe: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::new();
    for family in snapshots.chunk_by(|a, b| a.id.name() == b.id.name()) {
        let Some(first) = family.first() else { continue };
        let name = first.id.name();
        let help = describe(name);
        match first.kind() {
            MeterKind::Counter => render_counters(&mut out, name, help.as_deref(), family),
            MeterKind::Gauge => render_gauges(&mut out, name, help.as_deref(), family),
            MeterKind::Timer => render_timers(&mut out, name, help.as_deref(), family),
        }
    }
    out
}

fn header(out: &mut String, family: &str, help: Option<&str>, kind: &str) {
    if let Some(help) = help {
        let _ = writeln!(out, "# HELP {} {}", family, escape_help(help));
    }
    let _ = writeln!(out, "# TYPE {} {}", family, kind);
}

fn render_counters(out: &mut String, name: &str, help: Option<&str>, family: &[MeterSnapshot]) {
    let metric = family_name(name, MeterKind::Counter);
    header(out, &metric, help, "counter");
    for s in family {
        if let MeterValue::Counter(v) = s.value {
            let _ = writeln!(out, "{}{} {}", metric, label_str(s.id.tags(), None), v);
        }
    }
}

fn render_gauges(out: &mut String, name: &str, help: Option<&str>, family: &[MeterSnapshot]) {
    let metric = family_name(name, MeterKind::Gauge);
    header(out, &metric, help, "gauge");
    for s in family {
        if let MeterValue::Gauge(v) = s.value {
            let _ = writeln!(out, "{}{} {}", metric, label_str(s.id.tags(), None), v);
        }
    }
}

fn render_timers(out: &mut String, name: &str, help: Option<&str>, family: &[MeterSnapshot]) {
    let metric = family_name(name, MeterKind::Timer);
    let timers: Vec<(&Tags, &TimerSnapshot)> = family
        .iter()
        .filter_map(|s| match &s.value {
            MeterValue::Timer(t) => Some((s.id.tags(), t)),
            _ => None,
        })
        .collect();

    let is_histogram = timers.iter().any(|(_, t)| !t.buckets.is_empty());
    header(out, &metric, help, if is_histogram { "histogram" } else { "summary" });
    for (tags, t) in &timers {
        let labels = label_str(tags, None);
        if is_histogram {
            for (le, count) in &t.buckets {
                let le = seconds(*le);
                let _ = writeln!(
                    out,
                    "{}_bucket{} {}",
                    metric,
                    label_str(tags, Some(("le", le.as_str()))),
                    count
                );
            }
            let _ = writeln!(
                out,
                "{}_bucket{} {}",
                metric,
                label_str(tags, Some(("le", "+Inf"))),
                t.count
            );
        }
        let _ = writeln!(out, "{}_count{} {}", metric, labels, t.count);
        let _ = writeln!(out, "{}_sum{} {}", metric, labels, seconds(t.total));
    }

    let max_family = format!("{metric}_max");
    header(out, &max_family, None, "gauge");
    for (tags, t) in &timers {
        let _ = writeln!(out, "{}{} {}", max_family, label_str(tags, None), seconds(t.max));
    }
}
