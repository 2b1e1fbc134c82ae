use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use oscprims_peer::ConsoleEmulator;
use serde::Serialize;
use tracing::info;

use crate::cmd::EmulateArgs;
use crate::exit::{io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat};

const IDLE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Serialize)]
struct EmulateOutput {
    schema_id: &'static str,
    listen: String,
}

/// Serve the console emulator until interrupted.
pub fn run(args: EmulateArgs, format: OutputFormat) -> CliResult<i32> {
    let console = ConsoleEmulator::bind(args.bind.as_str())
        .map_err(|err| io_error(&format!("bind {} failed", args.bind), err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let listen = console.addr().to_string();
    print_report(
        &EmulateOutput {
            schema_id: "https://schemas.3leaps.dev/oscprims/cli/v1/emulator-listening.schema.json",
            listen: listen.clone(),
        },
        &[("listen", listen.clone())],
        format,
    );
    info!(%listen, "console emulator running");

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(IDLE_INTERVAL);
    }

    info!(datagrams = console.received(), "console emulator stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
