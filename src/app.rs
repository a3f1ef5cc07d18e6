use std::path::PathBuf;
use std::time::Duration;

use log::debug;

use crate::config::{Args, Collector, ConfigError, Identity, Prompt};
use crate::grader::grade;
use crate::record::{GradingKey, GradingRecord};
use crate::transport::HttpTransport;
use crate::writer::{summary, ResultWriter};
use crate::Result;

#[derive(Debug)]
pub enum Outcome {
    /// Input was rejected; nothing was sent or written.
    Rejected(ConfigError),
    Graded { path: PathBuf, record: GradingRecord },
}

pub async fn run<P: Prompt, I: Identity>(args: &Args, prompt: P, identity: I) -> Result<Outcome> {
    let config = match Collector::new(prompt, identity, args.presets()).collect() {
        Ok(config) => config,
        Err(ConfigError::Io(err)) => return Err(err.into()),
        Err(err) => {
            println!("\n{err}");
            return Ok(Outcome::Rejected(err));
        }
    };
    debug!("grading with {config:?}");

    let key = GradingKey::generate();
    let mut transport = HttpTransport::new(
        config.scheme,
        &config.host,
        &config.port,
        Duration::from_secs(args.timeout),
    );
    let record = grade(&mut transport, &config, &key).await;
    debug!("{} answered with {}", config.host_url(), record.response_code());

    let path = ResultWriter::new(&args.output).write(&record)?;
    println!("{}", summary(&record, &path));
    println!();

    Ok(Outcome::Graded { path, record })
}
