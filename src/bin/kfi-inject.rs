//! `kfi-inject`: inject one fault into a running process and print what changed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use faultvisor::{BackendError, FaultInjector, KfiInjector};

/// kfi-inject - flip one random register bit of a running process
#[derive(Parser, Debug)]
#[command(name = "kfi-inject")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Target process
    pid: u32,

    /// Proc entry of the kfi module
    #[arg(long, default_value = KfiInjector::DEFAULT_ENTRY)]
    entry: PathBuf,
}

impl Cli {
    async fn inject(&self) -> Result<String, BackendError> {
        KfiInjector::at(&self.entry).inject(self.pid).await
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.inject().await {
        Ok(description) => {
            println!("{description}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(255)
        }
    }
}
