//! Exit condition report
//!
//! Text form is one line: an optional label, then the requested fields in
//! fixed order joined by `/`:
//!
//! ```text
//! exit condition report:T/5/2/+++-++
//!                       │ │ │ └ ping map
//!                       │ │ └ failed rounds
//!                       │ └ successful rounds
//!                       └ condition state
//! ```

use crate::condition::{Condition, ReportFlags};
use crate::probe::ProbeTotals;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Prefix printed unless the `q` option was given
pub const REPORT_LABEL: &str = "exit condition report:";

/// One field of the text report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    State,
    Successes,
    Failures,
    Map,
}

impl ReportField {
    /// Output order
    pub const ORDER: [ReportField; 4] = [
        ReportField::State,
        ReportField::Successes,
        ReportField::Failures,
        ReportField::Map,
    ];

    pub fn enabled(self, flags: &ReportFlags) -> bool {
        match self {
            Self::State => flags.state,
            Self::Successes => flags.successes,
            Self::Failures => flags.failures,
            Self::Map => flags.map,
        }
    }

    pub fn format(self, condition: &Condition, totals: &ProbeTotals) -> String {
        match self {
            Self::State => {
                let state = if condition.is_met() { "T" } else { "F" };
                state.to_string()
            }
            Self::Successes => totals.received.to_string(),
            Self::Failures => totals.errors.to_string(),
            Self::Map => condition
                .ping_map()
                .map(|map| map.render())
                .unwrap_or_default(),
        }
    }
}

/// Render the text report, or `None` when there is nothing to print
///
/// Without `force`, a condition with no report fields prints nothing.
///
/// # Example
/// ```
/// use pingexit::condition::Condition;
/// use pingexit::probe::ProbeTotals;
/// use pingexit::report::render;
///
/// let condition: Condition = "3:N".parse().unwrap();
/// let totals = ProbeTotals { transmitted: 7, received: 5, errors: 2 };
/// assert_eq!(
///     render(Some(&condition), &totals, false).as_deref(),
///     Some("exit condition report:5/2\n")
/// );
/// ```
pub fn render(condition: Option<&Condition>, totals: &ProbeTotals, force: bool) -> Option<String> {
    let condition = condition?;
    let flags = condition.report_flags();
    if !force && !flags.any() {
        return None;
    }

    let mut line = String::new();
    if !flags.silent {
        line.push_str(REPORT_LABEL);
    }

    let mut emitted = false;
    for field in ReportField::ORDER {
        if !field.enabled(&flags) {
            continue;
        }
        if emitted {
            line.push('/');
        }
        emitted = true;
        line.push_str(&field.format(condition, totals));
    }

    line.push('\n');
    Some(line)
}

/// Write the text report; returns whether anything was written
pub fn write_report<W: Write>(
    out: &mut W,
    condition: Option<&Condition>,
    totals: &ProbeTotals,
    force: bool,
) -> io::Result<bool> {
    match render(condition, totals, force) {
        Some(line) => {
            out.write_all(line.as_bytes())?;
            out.flush()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Machine-readable report for `--format json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionReport {
    pub condition_met: bool,
    pub expect: u64,
    pub successes: u64,
    pub failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
}

/// Structured counterpart of [`render`], with the same gating
///
/// All values are included regardless of which text fields were requested.
pub fn report(
    condition: Option<&Condition>,
    totals: &ProbeTotals,
    force: bool,
) -> Option<ConditionReport> {
    let condition = condition?;
    if !force && !condition.report_flags().any() {
        return None;
    }

    Some(ConditionReport {
        condition_met: condition.is_met(),
        expect: condition.expect(),
        successes: totals.received,
        failures: totals.errors,
        map: condition.ping_map().map(|map| map.render()),
    })
}
