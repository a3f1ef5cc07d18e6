mod app;
mod config;
mod grader;
mod record;
#[cfg(test)]
mod test_server;
mod transport;
mod writer;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, info};

use app::Outcome;
use config::{Args, EnvIdentity, LinePrompt};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    pretty_env_logger::init();
    let args = Args::parse();

    let prompt = LinePrompt::new(io::stdin().lock(), io::stdout());
    match app::run(&args, prompt, EnvIdentity).await? {
        Outcome::Rejected(err) => {
            debug!("rejected input: {err:?}");
            Ok(ExitCode::FAILURE)
        }
        Outcome::Graded { path, record } => {
            info!(
                "record with status {} written to {}",
                record.response_code(),
                path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
