use clap::{Args, Subcommand};

use oscprims_peer::{Connection, ConnectionConfig, DEFAULT_PORT};
use oscprims_transport::RecvTimeout;

use crate::exit::{peer_error, CliResult};
use crate::output::OutputFormat;

pub mod copy;
pub mod emulate;
pub mod get;
pub mod probe;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe a console and print its identity.
    Probe(ProbeArgs),
    /// Query one address and print the reply.
    Get(GetArgs),
    /// Send one message, optionally waiting for the reply.
    Send(SendArgs),
    /// Copy the value at one address to another.
    Copy(CopyArgs),
    /// Run a local console emulator.
    Emulate(EmulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format),
        Command::Get(args) => get::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Copy(args) => copy::run(args, format),
        Command::Emulate(args) => emulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the console is and how long to wait for it.
///
/// Timeouts are milliseconds: `0` polls once, negative waits forever.
#[derive(Args, Debug, Clone)]
pub struct ConsoleArgs {
    /// Console host name or IP address.
    pub host: String,
    /// Console UDP port.
    #[arg(long, short = 'p', env = "OSCPRIMS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Reply timeout in milliseconds.
    #[arg(long, default_value_t = 50, allow_negative_numbers = true)]
    pub timeout: i64,
    /// Liveness probe timeout in milliseconds.
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    pub probe_timeout: i64,
    /// Liveness probe address (`/info` for full-size consoles, `/xinfo` for rack units).
    #[arg(long, env = "OSCPRIMS_PROBE_ADDRESS", default_value = oscprims_peer::INFO_PROBE_ADDRESS)]
    pub probe_address: String,
}

impl ConsoleArgs {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            probe_address: self.probe_address.clone(),
            probe_timeout: RecvTimeout::from_millis(self.probe_timeout),
            reply_timeout: RecvTimeout::from_millis(self.timeout),
            ..ConnectionConfig::default()
        }
    }

    /// A validated, still disconnected connection.
    pub fn connection(&self) -> CliResult<Connection> {
        Connection::with_config(&self.host, self.port, self.connection_config())
            .map_err(|err| peer_error("invalid connection settings", err))
    }

    /// Connect and require the console to confirm.
    pub fn connect(&self) -> CliResult<Connection> {
        oscprims_peer::connect_with_config(&self.host, self.port, self.connection_config())
            .map_err(|err| peer_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub console: ConsoleArgs,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub console: ConsoleArgs,
    /// Parameter address, e.g. /ch/01/mix/fader.
    pub address: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub console: ConsoleArgs,
    /// Parameter or command address.
    pub address: String,
    /// Type tags, one per value (`i` int, `f` float, `s` text). Inferred when omitted.
    #[arg(long, short = 't')]
    pub types: Option<String>,
    /// Argument values in tag order.
    #[arg(allow_negative_numbers = true)]
    pub values: Vec<String>,
    /// Wait for the reply to the same address and print it.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    #[command(flatten)]
    pub console: ConsoleArgs,
    /// Address to read.
    pub from: String,
    /// Address to write.
    pub to: String,
}

#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Local address to listen on.
    #[arg(long, default_value = "127.0.0.1:10023")]
    pub bind: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
