use anyhow::{bail, Context, Result};
use clap::Parser;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use pingexit::cli::{Cli, OutputFormat};
use pingexit::condition::{exit_status_for, Condition};
use pingexit::config::PingExitConfig;
use pingexit::probe::{CommandProbe, ProbeLoop, ProbeSource, RunSummary, ScriptedProbe};
use pingexit::{grammar, report};
use std::ffi::c_int;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit status for errors raised before or outside the probe loop
const FATAL_STATUS: i32 = 2;

/// Set by SIGINT/SIGTERM, polled by the probe loop between rounds
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_signal: c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Stop the loop on SIGINT/SIGTERM so the final report still gets printed
fn install_signal_handlers() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_terminate),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic.
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("Failed to install {:?} handler", signal))?;
    }
    Ok(())
}

/// Build the probe source from either --outcomes or the trailing command
fn probe_source(outcomes: Option<String>, command: Option<Vec<String>>) -> Result<Box<dyn ProbeSource>> {
    match (outcomes, command) {
        (Some(script), None) => {
            let script = if script == "-" {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read outcomes from stdin")?;
                buf
            } else {
                script
            };
            Ok(Box::new(ScriptedProbe::from_script(&script)?))
        }
        (None, Some(command)) => Ok(Box::new(CommandProbe::new(&command)?)),
        (Some(_), Some(_)) => {
            bail!("Cannot specify both --outcomes and a probe command. Choose one.");
        }
        (None, None) => {
            bail!("Must specify either --outcomes or a probe command. Usage: pingexit -x SPEC --outcomes SCRIPT or pingexit -x SPEC -- COMMAND [ARGS...]");
        }
    }
}

/// Print the final report in the requested format
fn print_report(
    condition: Option<&Condition>,
    summary: &RunSummary,
    format: OutputFormat,
    force: bool,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            report::write_report(&mut io::stdout().lock(), condition, &summary.totals, force)
                .context("Failed to write report")?;
        }
        OutputFormat::Json => {
            if let Some(r) = report::report(condition, &summary.totals, force) {
                println!("{}", serde_json::to_string(&r)?);
            }
        }
    }
    Ok(())
}

fn run(args: Cli) -> Result<i32> {
    let config = match &args.config {
        Some(path) => PingExitConfig::from_file(path)?,
        None => PingExitConfig::default(),
    };

    let interval = match args.interval {
        Some(secs) if !secs.is_finite() || secs < 0.0 => {
            bail!("Invalid value for --interval: {} (must be >= 0)", secs);
        }
        Some(secs) => match Duration::try_from_secs_f64(secs) {
            Ok(interval) => interval,
            Err(e) => bail!("Invalid value for --interval: {} ({})", secs, e),
        },
        // Replayed outcomes have nothing to wait for
        None if args.outcomes.is_some() => Duration::ZERO,
        None => Duration::from_millis(config.probe.interval_ms),
    };

    // -x is parsed before anything is probed
    let mut condition = match &args.exit_cond {
        Some(spec) => Some(grammar::parse_with(spec, &config.map)?),
        None => None,
    };

    let mut source = probe_source(args.outcomes, args.command)?;
    install_signal_handlers()?;

    let summary = ProbeLoop::new()
        .with_count(args.count.or(config.probe.count))
        .with_interval(interval)
        .with_interrupt(&INTERRUPTED)
        .run(source.as_mut(), condition.as_mut());

    print_report(condition.as_ref(), &summary, args.format, args.force_report)?;

    if args.map_debug {
        if let Some(map) = condition.as_ref().and_then(Condition::ping_map) {
            eprintln!("{}", map.render_debug());
        }
    }

    Ok(exit_status_for(condition.as_ref(), summary.ordinary_status()))
}

fn main() {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let status = match run(args) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("pingexit: {:#}", e);
            FATAL_STATUS
        }
    };
    std::process::exit(status);
}
