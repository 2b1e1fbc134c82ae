use crate::cmd::GetArgs;
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_message, OutputFormat};

pub fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    let mut conn = args.console.connect()?;

    let reply = conn
        .request(&args.address, &[])
        .map_err(|err| peer_error("query failed", err))?;

    match reply {
        Some(msg) => {
            print_message(&msg, conn.remote(), format);
            Ok(SUCCESS)
        }
        None => Err(no_reply(&args.address, args.console.timeout)),
    }
}

pub(crate) fn no_reply(address: &str, timeout_ms: i64) -> CliError {
    CliError::new(
        TIMEOUT,
        format!("no reply from {address} within {timeout_ms}ms"),
    )
}
