mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "oscprims", version, about = "Mixing console control CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_subcommand() {
        let cli = Cli::try_parse_from([
            "oscprims",
            "get",
            "192.168.1.62",
            "/ch/01/mix/fader",
            "--timeout",
            "200",
        ])
        .expect("get args should parse");

        match cli.command {
            Command::Get(args) => {
                assert_eq!(args.console.host, "192.168.1.62");
                assert_eq!(args.address, "/ch/01/mix/fader");
                assert_eq!(args.console.timeout, 200);
                assert_eq!(args.console.probe_timeout, 100);
                assert_eq!(args.console.probe_address, "/info");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_send_with_negative_values() {
        let cli = Cli::try_parse_from([
            "oscprims",
            "send",
            "mixer.local",
            "/ch/01/eq/1",
            "--types",
            "iff",
            "2",
            "-3.5",
            "0.7",
            "--wait",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.types.as_deref(), Some("iff"));
                assert_eq!(args.values, vec!["2", "-3.5", "0.7"]);
                assert!(args.wait);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn negative_timeout_means_forever() {
        let cli = Cli::try_parse_from([
            "oscprims",
            "probe",
            "10.0.0.2",
            "--probe-timeout",
            "-1",
            "--port",
            "10024",
        ])
        .expect("probe args should parse");

        match cli.command {
            Command::Probe(args) => {
                let config = args.console.connection_config();
                assert_eq!(config.probe_timeout, oscprims_transport::RecvTimeout::Forever);
                assert_eq!(args.console.port, 10024);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn copy_requires_two_addresses() {
        let err = Cli::try_parse_from(["oscprims", "copy", "10.0.0.2", "/ch/01/mix/fader"])
            .expect_err("missing destination should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "oscprims",
            "version",
            "--extended",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("global flags should parse anywhere");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        match cli.command {
            Command::Version(args) => assert!(args.extended),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
