//! Exit condition state and per-round evaluation
//!
//! A `Condition` is built once by [`crate::grammar::parse`] and then fed the
//! probe loop's running totals after every round. Cumulative conditions are
//! re-derived from those totals each time; sequence conditions keep their
//! own run counter.

use crate::error::{ConditionError, Result};
use crate::ping_map::PingMap;
use crate::probe::ProbeTotals;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// Which fields a report contains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportFlags {
    /// Successful round count
    pub successes: bool,
    /// Failed round count
    pub failures: bool,
    /// Condition state letter `T`/`F`
    pub state: bool,
    /// Ping map
    pub map: bool,
    /// Omit the report label
    pub silent: bool,
}

impl ReportFlags {
    /// True if at least one report field was requested
    ///
    /// `silent` alone does not ask for a report.
    pub fn any(&self) -> bool {
        self.successes || self.failures || self.state || self.map
    }
}

/// How the process exit status relates to the condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// `x` not given: the ordinary exit status is used
    Disabled,
    /// `x` given, condition not met yet
    Pending,
    /// `x` given and the condition was met
    Met,
}

impl ExitStatus {
    /// Map the ordinary exit status to the final one
    ///
    /// Only the ordinary success/failure codes (0 and 1) are translated;
    /// anything else signals a real error and passes through.
    pub fn translate(self, ordinary: i32) -> i32 {
        match self {
            Self::Disabled => ordinary,
            _ if ordinary != 0 && ordinary != 1 => ordinary,
            Self::Met => 0,
            Self::Pending => 1,
        }
    }
}

/// Final exit status for an optional condition
pub fn exit_status_for(condition: Option<&Condition>, ordinary: i32) -> i32 {
    match condition {
        Some(c) => c.exit_status().translate(ordinary),
        None => ordinary,
    }
}

/// Parsed `-x` specification plus its runtime state
///
/// # Example
/// ```
/// use pingexit::condition::Condition;
/// use pingexit::probe::ProbeTotals;
///
/// let mut condition: Condition = "2s:x".parse().unwrap();
/// let mut totals = ProbeTotals::default();
///
/// totals.record(true);
/// assert!(!condition.evaluate(&totals));
/// totals.record(true);
/// assert!(condition.evaluate(&totals));
/// assert!(condition.is_met());
/// ```
#[derive(Debug, Clone)]
pub struct Condition {
    expect: u64,
    count_failures: bool,
    require_sequence: bool,
    exit_on_condition: bool,
    report: ReportFlags,
    map: Option<PingMap>,

    condition_met: bool,
    last_received: u64,
    last_errors: u64,
    sequence: u64,
}

impl Condition {
    pub(crate) fn new(
        expect: u64,
        count_failures: bool,
        require_sequence: bool,
        exit_on_condition: bool,
        report: ReportFlags,
        map: Option<PingMap>,
    ) -> Self {
        Self {
            expect,
            count_failures,
            require_sequence,
            exit_on_condition,
            report,
            map,
            condition_met: false,
            last_received: 0,
            last_errors: 0,
            sequence: 0,
        }
    }

    /// Parse a `-x` specification with default map settings
    pub fn from_spec(spec: &str) -> Result<Self> {
        crate::grammar::parse(spec)
    }

    /// Feed the totals after a round; true if the condition holds this round
    ///
    /// Calling without any counter having moved is not an error and returns
    /// false. If more than one outcome arrived since the last call, each
    /// counter that moved counts as one event (failure first).
    pub fn evaluate(&mut self, totals: &ProbeTotals) -> bool {
        if totals.received < self.last_received || totals.errors < self.last_errors {
            warn!(
                received = totals.received,
                errors = totals.errors,
                last_received = self.last_received,
                last_errors = self.last_errors,
                "probe totals went backwards, resynchronising"
            );
        }

        let successes = totals.received.saturating_sub(self.last_received);
        let failures = totals.errors.saturating_sub(self.last_errors);
        self.last_received = totals.received;
        self.last_errors = totals.errors;

        if successes == 0 && failures == 0 {
            trace!(transmitted = totals.transmitted, "no new outcome");
            return false;
        }
        if successes + failures > 1 {
            warn!(
                successes,
                failures, "more than one outcome since last evaluation"
            );
        }

        let mut run_complete = false;
        if failures > 0 {
            run_complete |= self.observe(false);
        }
        if successes > 0 {
            run_complete |= self.observe(true);
        }

        let met = if self.require_sequence {
            run_complete
        } else {
            self.counted(totals) >= self.expect
        };

        trace!(
            transmitted = totals.transmitted,
            received = totals.received,
            errors = totals.errors,
            sequence = self.sequence,
            met,
            "evaluated exit condition"
        );

        if met && !self.condition_met {
            self.condition_met = true;
            debug!(expect = self.expect, "exit condition met");
        }
        met
    }

    /// Record one outcome; true if it completes the required run
    fn observe(&mut self, success: bool) -> bool {
        if let Some(map) = self.map.as_mut() {
            map.record(success);
        }
        if !self.require_sequence {
            return false;
        }

        if success != self.count_failures {
            self.sequence += 1;
        } else {
            self.sequence = 0;
        }
        self.sequence == self.expect
    }

    fn counted(&self, totals: &ProbeTotals) -> u64 {
        if self.count_failures {
            totals.errors
        } else {
            totals.received
        }
    }

    /// Exit status override derived from `x` and the met latch
    pub fn exit_status(&self) -> ExitStatus {
        match (self.exit_on_condition, self.condition_met) {
            (false, _) => ExitStatus::Disabled,
            (true, false) => ExitStatus::Pending,
            (true, true) => ExitStatus::Met,
        }
    }

    pub fn exit_status_for(&self, ordinary: i32) -> i32 {
        self.exit_status().translate(ordinary)
    }

    pub fn expect(&self) -> u64 {
        self.expect
    }

    pub fn counts_failures(&self) -> bool {
        self.count_failures
    }

    pub fn requires_sequence(&self) -> bool {
        self.require_sequence
    }

    pub fn exits_on_condition(&self) -> bool {
        self.exit_on_condition
    }

    pub fn report_flags(&self) -> ReportFlags {
        self.report
    }

    /// Whether the condition has been met at least once
    pub fn is_met(&self) -> bool {
        self.condition_met
    }

    /// Current length of the consecutive run (sequence mode only)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Last seen (successes, failures)
    pub fn outcome_counts(&self) -> (u64, u64) {
        (self.last_received, self.last_errors)
    }

    pub fn ping_map(&self) -> Option<&PingMap> {
        self.map.as_ref()
    }

    pub fn max_map_size(&self) -> Option<usize> {
        self.map.as_ref().map(PingMap::max_size)
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_spec(s)
    }
}

/// Canonical specification with the same effective semantics
impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count_failures {
            f.write_str("-")?;
        }
        write!(f, "{}", self.expect)?;
        if self.require_sequence {
            f.write_str("s")?;
        }
        f.write_str(":")?;

        if self.exit_on_condition {
            f.write_str("x")?;
        }
        match (self.report.successes, self.report.failures) {
            (true, true) => f.write_str("N")?,
            (true, false) => f.write_str("+n")?,
            (false, true) => f.write_str("-n")?,
            (false, false) => {}
        }
        if self.report.state {
            f.write_str("c")?;
        }
        if self.report.silent {
            f.write_str("q")?;
        }
        if let Some(map) = &self.map {
            let glyphs = map.glyphs();
            write!(
                f,
                "m({}:{}{})",
                map.max_size(),
                glyphs.success,
                glyphs.failure
            )?;
        }
        Ok(())
    }
}
