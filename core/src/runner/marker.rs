//! Result marker lines.
//!
//! A runner may print `<marker>{"outcome":"skipped","message":"..."}` on stdout
//! to report an outcome that its exit code cannot express. The last valid
//! marker line wins; marker lines are stripped from the captured output.

use serde::Deserialize;

use crate::model::TestOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerReport {
    pub outcome: TestOutcome,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct RawReport {
    outcome: String,
    #[serde(default)]
    message: Option<String>,
}

/// Splits captured stdout into the output without marker lines and the last report.
pub fn extract_report(stdout: &str, marker: &str) -> (String, Option<MarkerReport>) {
    if marker.is_empty() || !stdout.contains(marker) {
        return (stdout.to_string(), None);
    }

    let mut kept = String::with_capacity(stdout.len());
    let mut report = None;
    for line in stdout.split_inclusive('\n') {
        let Some(pos) = line.find(marker) else {
            kept.push_str(line);
            continue;
        };
        let payload = line[pos + marker.len()..].trim();
        match parse_payload(payload) {
            Some(r) => report = Some(r),
            None => {
                tracing::warn!(
                    target: "testexec.runner",
                    payload = %payload,
                    "ignoring malformed result marker"
                );
            }
        }
        // keep whatever the runner printed before the marker on the same line
        let before = &line[..pos];
        if !before.trim().is_empty() {
            kept.push_str(before);
            kept.push('\n');
        }
    }
    (kept, report)
}

fn parse_payload(payload: &str) -> Option<MarkerReport> {
    let raw: RawReport = serde_json::from_str(payload).ok()?;
    let outcome = raw.outcome.parse().ok()?;
    Some(MarkerReport {
        outcome,
        message: raw.message.filter(|m| !m.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const M: &str = "@@TESTEXEC_RESULT@@";

    #[test]
    fn output_without_marker_is_untouched() {
        let (out, report) = extract_report("line 1\nline 2\n", M);
        assert_eq!(out, "line 1\nline 2\n");
        assert_eq!(report, None);
    }

    #[test]
    fn marker_is_stripped_and_parsed() {
        let stdout = format!(
            "before\n{M}{{\"outcome\":\"skipped\",\"message\":\"not on this platform\"}}\nafter\n"
        );
        let (out, report) = extract_report(&stdout, M);
        assert_eq!(out, "before\nafter\n");
        assert_eq!(
            report,
            Some(MarkerReport {
                outcome: TestOutcome::Skipped,
                message: Some("not on this platform".to_string()),
            })
        );
    }

    #[test]
    fn last_valid_marker_wins() {
        let stdout = format!(
            "{M}{{\"outcome\":\"failed\"}}\n{M}not json\n{M}{{\"outcome\":\"passed\"}}\n"
        );
        let (out, report) = extract_report(&stdout, M);
        assert_eq!(out, "");
        assert_eq!(report.map(|r| r.outcome), Some(TestOutcome::Passed));
    }

    #[test]
    fn unknown_outcome_is_ignored() {
        let stdout = format!("{M}{{\"outcome\":\"flaky\"}}\n");
        let (_, report) = extract_report(&stdout, M);
        assert_eq!(report, None);
    }
}
