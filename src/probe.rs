//! Probe sources and the round loop that drives an exit condition
//!
//! The loop sends one probe per round, keeps running totals and hands them
//! to the condition. It stops when the condition holds, when the round cap
//! is reached, when the source runs dry, or when interrupted.

use crate::condition::Condition;
use anyhow::{bail, Context, Result};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Running totals published after each round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeTotals {
    /// Probes sent
    pub transmitted: u64,
    /// Probes that succeeded
    pub received: u64,
    /// Probes that failed
    pub errors: u64,
}

impl ProbeTotals {
    /// Account for one finished round
    pub fn record(&mut self, success: bool) {
        self.transmitted += 1;
        if success {
            self.received += 1;
        } else {
            self.errors += 1;
        }
    }

    /// Ordinary exit status: 0 if anything answered, 1 otherwise
    pub fn ordinary_status(&self) -> i32 {
        if self.received > 0 {
            0
        } else {
            1
        }
    }
}

/// One probe per call
pub trait ProbeSource {
    /// Run one probe. `Ok(None)` means the source has nothing left to send.
    fn probe(&mut self) -> Result<Option<bool>>;
}

/// Replays a fixed list of outcomes
///
/// # Example
/// ```
/// use pingexit::probe::{ProbeSource, ScriptedProbe};
///
/// let mut probe = ScriptedProbe::from_script("+-").unwrap();
/// assert_eq!(probe.probe().unwrap(), Some(true));
/// assert_eq!(probe.probe().unwrap(), Some(false));
/// assert_eq!(probe.probe().unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedProbe {
    outcomes: std::vec::IntoIter<bool>,
}

impl ScriptedProbe {
    pub fn new(outcomes: Vec<bool>) -> Self {
        Self {
            outcomes: outcomes.into_iter(),
        }
    }

    /// Parse an outcome script
    ///
    /// `+`, `1`, `s` are successes; `-`, `0`, `f` failures (letters in
    /// either case). Whitespace and commas are ignored.
    pub fn from_script(script: &str) -> Result<Self> {
        let mut outcomes = Vec::with_capacity(script.len());
        for (i, c) in script.chars().enumerate() {
            match c {
                '+' | '1' | 's' | 'S' => outcomes.push(true),
                '-' | '0' | 'f' | 'F' => outcomes.push(false),
                c if c.is_whitespace() || c == ',' => {}
                c => bail!(
                    "Invalid outcome '{}' at position {} (expected one of + - 1 0 s f)",
                    c,
                    i + 1
                ),
            }
        }
        Ok(Self::new(outcomes))
    }
}

impl ProbeSource for ScriptedProbe {
    fn probe(&mut self) -> Result<Option<bool>> {
        Ok(self.outcomes.next())
    }
}

/// Runs a command once per round; exit status 0 is a success
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
}

impl CommandProbe {
    pub fn new(command: &[String]) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("Empty probe command");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ProbeSource for CommandProbe {
    fn probe(&mut self) -> Result<Option<bool>> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run probe command '{}'", self.program))?;

        debug!(program = %self.program, ?status, "probe command finished");
        Ok(Some(status.success()))
    }
}

/// Why the round loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ConditionMet,
    CountReached,
    SourceExhausted,
    Interrupted,
    ProbeFailed,
}

/// Result of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub totals: ProbeTotals,
    pub reason: StopReason,
}

impl RunSummary {
    /// Exit status before any exit condition translation
    ///
    /// A probe that could not be run at all yields 2.
    pub fn ordinary_status(&self) -> i32 {
        match self.reason {
            StopReason::ProbeFailed => 2,
            _ => self.totals.ordinary_status(),
        }
    }
}

/// Round loop configuration
///
/// # Example
/// ```
/// use pingexit::condition::Condition;
/// use pingexit::probe::{ProbeLoop, ScriptedProbe, StopReason};
///
/// let mut condition: Condition = "2s:".parse().unwrap();
/// let mut source = ScriptedProbe::from_script("+-++-").unwrap();
/// let summary = ProbeLoop::new().run(&mut source, Some(&mut condition));
///
/// assert_eq!(summary.reason, StopReason::ConditionMet);
/// assert_eq!(summary.totals.transmitted, 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProbeLoop<'a> {
    count: Option<u64>,
    interval: Duration,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> ProbeLoop<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `count` rounds
    pub fn with_count(mut self, count: Option<u64>) -> Self {
        self.count = count;
        self
    }

    /// Pause between rounds
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Flag polled between rounds; set it to stop the loop early
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Drive `source` until a stop reason applies
    ///
    /// A failing probe ends the run instead of aborting it, so the caller
    /// can still report what was gathered.
    pub fn run<S: ProbeSource + ?Sized>(
        &self,
        source: &mut S,
        mut condition: Option<&mut Condition>,
    ) -> RunSummary {
        let mut totals = ProbeTotals::default();

        let reason = loop {
            if self.interrupted() {
                break StopReason::Interrupted;
            }
            if self.count.is_some_and(|count| totals.transmitted >= count) {
                break StopReason::CountReached;
            }

            if totals.transmitted > 0 {
                self.pause();
                if self.interrupted() {
                    break StopReason::Interrupted;
                }
            }

            let success = match source.probe() {
                Ok(Some(success)) => success,
                Ok(None) => break StopReason::SourceExhausted,
                Err(e) => {
                    eprintln!("pingexit: {:#}", e);
                    break StopReason::ProbeFailed;
                }
            };
            totals.record(success);

            if let Some(cond) = condition.as_deref_mut() {
                if cond.evaluate(&totals) {
                    break StopReason::ConditionMet;
                }
            }
        };

        info!(
            transmitted = totals.transmitted,
            received = totals.received,
            errors = totals.errors,
            ?reason,
            "probe loop finished"
        );
        RunSummary { totals, reason }
    }

    /// Sleep for the interval in short slices so an interrupt is noticed
    fn pause(&self) {
        const SLICE: Duration = Duration::from_millis(50);

        let deadline = Instant::now() + self.interval;
        loop {
            let now = Instant::now();
            if now >= deadline || self.interrupted() {
                return;
            }
            thread::sleep(SLICE.min(deadline - now));
        }
    }
}
