use std::env;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use url::Url;

const DEFAULT_WORKSHOP: &str = "1";
const DEFAULT_TRANSPORT: &str = "http";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8000";

/// Checks a student's tutorials REST service and records the outcome.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Student name (prompted when omitted)
    #[arg(long)]
    pub name: Option<String>,

    /// Workshop week, 1 to 4 (prompted when omitted)
    #[arg(long)]
    pub workshop: Option<String>,

    /// Transport scheme, http or https (prompted when omitted)
    #[arg(long)]
    pub transport: Option<String>,

    /// Host of the service under test (prompted when omitted)
    #[arg(long)]
    pub host: Option<String>,

    /// Port of the service under test (prompted when omitted)
    #[arg(long)]
    pub port: Option<String>,

    /// Where the grading record is written
    #[arg(long, default_value = "results.json")]
    pub output: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 3)]
    pub timeout: u64,
}

impl Args {
    pub fn presets(&self) -> Presets {
        Presets {
            name: self.name.clone(),
            workshop: self.workshop.clone(),
            transport: self.transport.clone(),
            host: self.host.clone(),
            port: self.port.clone(),
        }
    }
}

/// Answers supplied up front; each one replaces its prompt.
#[derive(Debug, Clone, Default)]
pub struct Presets {
    pub name: Option<String>,
    pub workshop: Option<String>,
    pub transport: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Please provide a valid name!")]
    Name,
    #[error("Please select a valid workshop!  1, 2, 3, or 4")]
    Workshop,
    #[error("Please select a valid protocol!  http or https")]
    Transport,
    #[error("Please enter a valid host address! Unable to resolve '{0}'")]
    Host(String),
    #[error("Please enter a valid port in numeric range 0-65535!")]
    Port,
    #[error("could not read answer: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Workshop {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
}

impl Workshop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workshop::One => "1",
            Workshop::Two => "2",
            Workshop::Three => "3",
            Workshop::Four => "4",
        }
    }
}

impl FromStr for Workshop {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Workshop::One),
            "2" => Ok(Workshop::Two),
            "3" => Ok(Workshop::Three),
            "4" => Ok(Workshop::Four),
            _ => Err(ConfigError::Workshop),
        }
    }
}

impl fmt::Display for Workshop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl FromStr for Scheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(ConfigError::Transport),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: String,
    pub workshop: Workshop,
    pub scheme: Scheme,
    pub host: String,
    pub port: String,
}

impl Config {
    /// `{scheme}://{host}:{port}`, as stored in the grading record.
    pub fn host_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Line-oriented question/answer channel.
pub trait Prompt {
    fn say(&mut self, line: &str) -> io::Result<()>;

    /// Asks `question`, showing `default` in brackets. An empty answer
    /// yields the default.
    fn ask(&mut self, question: &str, default: &str) -> io::Result<String>;
}

pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{line}")
    }

    fn ask(&mut self, question: &str, default: &str) -> io::Result<String> {
        write!(self.output, "{question} [{default}]: ")?;
        self.output.flush()?;

        // EOF counts as an empty answer
        let mut line = String::new();
        self.input.read_line(&mut line)?;

        let answer = line.trim();
        if answer.is_empty() {
            Ok(default.to_owned())
        } else {
            Ok(answer.to_owned())
        }
    }
}

pub trait Identity {
    fn login_name(&self) -> Option<String>;
}

/// Reads the login name from the usual environment variables.
pub struct EnvIdentity;

impl Identity for EnvIdentity {
    fn login_name(&self) -> Option<String> {
        ["USER", "LOGNAME", "USERNAME"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .map(|name| name.trim().to_owned())
            .find(|name| !name.is_empty())
    }
}

pub struct Collector<P, I> {
    prompt: P,
    identity: I,
    presets: Presets,
}

impl<P: Prompt, I: Identity> Collector<P, I> {
    pub fn new(prompt: P, identity: I, presets: Presets) -> Self {
        Self {
            prompt,
            identity,
            presets,
        }
    }

    pub fn collect(mut self) -> Result<Config, ConfigError> {
        self.banner()?;

        let login = self.identity.login_name().unwrap_or_default();
        let name = self.answer(self.presets.name.clone(), "Enter your name", &login)?;
        if name.is_empty() {
            return Err(ConfigError::Name);
        }

        let workshop = self
            .answer(self.presets.workshop.clone(), "Enter workshop week", DEFAULT_WORKSHOP)?
            .parse::<Workshop>()?;

        let scheme = self
            .answer(self.presets.transport.clone(), "Enter transport", DEFAULT_TRANSPORT)?
            .to_lowercase()
            .parse::<Scheme>()?;

        let raw_host = self
            .answer(self.presets.host.clone(), "Enter host", DEFAULT_HOST)?
            .to_lowercase();
        let host = parse_host(&raw_host, scheme)?;

        let port = self
            .answer(self.presets.port.clone(), "Enter port", DEFAULT_PORT)?
            .to_lowercase();
        if !is_numeric(&port) {
            return Err(ConfigError::Port);
        }
        self.prompt.say("")?;

        Ok(Config {
            name,
            workshop,
            scheme,
            host,
            port,
        })
    }

    fn banner(&mut self) -> io::Result<()> {
        let rule = "#".repeat(55);
        self.prompt.say(&rule)?;
        self.prompt
            .say("Welcome to the auto-grader for the tutorials workshop!")?;
        self.prompt.say(" * User input required to continue")?;
        self.prompt.say(" * Default values are shown in brackets []")?;
        self.prompt
            .say("   ** Press 'enter' to accept default value **")?;
        self.prompt.say(&rule)?;
        self.prompt.say("")
    }

    fn answer(
        &mut self,
        preset: Option<String>,
        question: &str,
        default: &str,
    ) -> io::Result<String> {
        match preset {
            Some(value) => Ok(value.trim().to_owned()),
            None => self.prompt.ask(question, default),
        }
    }
}

/// Extracts the hostname from `raw`, retrying with `{scheme}://` prefixed
/// when the answer has no network location of its own.
fn parse_host(raw: &str, scheme: Scheme) -> Result<String, ConfigError> {
    let direct = Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned));

    let host = match direct {
        Some(host) => Some(host),
        None => Url::parse(&format!("{scheme}://{raw}"))
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned)),
    };

    host.filter(|host| !host.is_empty())
        .ok_or_else(|| ConfigError::Host(raw.to_owned()))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
