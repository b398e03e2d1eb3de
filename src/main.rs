//! `faultvisor` command-line front end.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use faultvisor::{
    BlcrBackend, CommandSpec, Config, KfiInjector, LogWriter, RestoreFailurePolicy, RunReport,
    Subscribe, Supervisor, Verdict,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// faultvisor - run a program under checkpoint/restart with injected faults
#[derive(Parser, Debug)]
#[command(name = "faultvisor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Checkpoint period, e.g. "30s" (0 disables checkpointing)
    #[arg(short = 'b', long, value_parser = humantime::parse_duration, default_value = "0s")]
    checkpoint_interval: Duration,

    /// Maximum number of checkpoints kept
    #[arg(long, default_value_t = 1)]
    retention: usize,

    /// How many times one checkpoint may be restored
    #[arg(long, default_value_t = 1)]
    retries: u32,

    /// Mean time between injected faults, e.g. "2m" (0 disables injection)
    #[arg(short = 'k', long, value_parser = humantime::parse_duration, default_value = "0s")]
    fault_interval: Duration,

    /// Overall deadline of the run (0 means none)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s")]
    deadline: Duration,

    /// Directory for checkpoint artifacts
    #[arg(long, default_value = ".")]
    checkpoint_dir: PathBuf,

    /// Try the next-older checkpoint when a restore fails instead of aborting
    #[arg(long)]
    fallback_on_restore_error: bool,

    /// Checkpoint library preloaded into the program when checkpointing is enabled
    #[arg(long, default_value = BlcrBackend::DEFAULT_PRELOAD)]
    preload: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Program command line, run through `bash -c`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            checkpoint_interval: self.checkpoint_interval,
            retention: self.retention,
            retry_limit: self.retries,
            fault_interval: self.fault_interval,
            deadline: self.deadline,
            checkpoint_dir: self.checkpoint_dir.clone(),
            restore_failure: if self.fallback_on_restore_error {
                RestoreFailurePolicy::Fallback
            } else {
                RestoreFailurePolicy::Abort
            },
            ..Config::default()
        }
    }

    fn program(&self) -> CommandSpec {
        let spec = CommandSpec::new(self.command.join(" "));
        if self.checkpoint_interval.is_zero() {
            spec
        } else {
            spec.with_preload(&self.preload)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cfg = cli.config();
    if cfg.checkpoint_period().is_some() {
        tokio::fs::create_dir_all(&cfg.checkpoint_dir)
            .await
            .with_context(|| format!("creating {}", cfg.checkpoint_dir.display()))?;
    }

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let mut builder = Supervisor::builder(cfg.clone(), Arc::new(BlcrBackend::new()))
        .with_subscribers(subs);
    if cfg.fault_mean().is_some() {
        builder = builder.with_injector(Arc::new(KfiInjector::new()));
    }
    let sup = builder.build();

    let program = cli.program();
    let result = sup.run(&program).await;
    sup.close().await;

    let report = match result {
        Ok(report) => report,
        Err(aborted) => {
            print_report(&aborted.report);
            return Err(anyhow::Error::new(aborted).context("supervised run aborted"));
        }
    };
    print_report(&report);

    Ok(match report.verdict {
        Verdict::Success => ExitCode::SUCCESS,
        Verdict::Failure => ExitCode::FAILURE,
        Verdict::Terminated(_) => ExitCode::from(130),
    })
}

fn print_report(r: &RunReport) {
    let verdict = match &r.verdict {
        Verdict::Success => "success".to_string(),
        Verdict::Failure => "failure".to_string(),
        Verdict::Terminated(why) => format!("terminated ({why})"),
    };
    println!("verdict:           {verdict}");
    println!("attempts:          {}", r.attempts);
    println!("checkpoints taken: {}", r.checkpoints);
    println!("faults injected:   {}", r.faults);
    println!("total time:        {:.3}s", r.total.as_secs_f64());
    println!(
        "checkpoint time:   {:.3}s ({:.2}%)",
        r.checkpoint_time.as_secs_f64(),
        r.checkpoint_share()
    );
    println!(
        "fault time:        {:.3}s ({:.2}%)",
        r.fault_time.as_secs_f64(),
        r.fault_share()
    );
    println!("running time:      {:.3}s", r.running_time().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "faultvisor",
            "-b",
            "30s",
            "--retention",
            "3",
            "--retries",
            "2",
            "-k",
            "2m",
            "--fallback-on-restore-error",
            "./solver",
            "--size",
            "64",
        ]);
        let cfg = cli.config();
        assert_eq!(cfg.checkpoint_interval, Duration::from_secs(30));
        assert_eq!(cfg.retention, 3);
        assert_eq!(cfg.retry_limit, 2);
        assert_eq!(cfg.fault_interval, Duration::from_secs(120));
        assert_eq!(cfg.restore_failure, RestoreFailurePolicy::Fallback);
        assert_eq!(
            cli.program().script(),
            "env LD_PRELOAD=/usr/local/lib/libcr_run.so.0 ./solver --size 64"
        );
    }

    #[test]
    fn no_preload_without_checkpoints() {
        let cli = Cli::parse_from(["faultvisor", "echo", "hi"]);
        assert!(cli.config().checkpoint_period().is_none());
        assert_eq!(cli.program().script(), "echo hi");
    }
}
