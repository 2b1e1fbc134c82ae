use serde::Serialize;
use tracing::warn;

use crate::cmd::ProbeArgs;
use crate::exit::{outcome_code, CliResult};
use crate::output::{print_report, OutputFormat};

#[derive(Serialize)]
struct ProbeOutput {
    schema_id: &'static str,
    host: String,
    port: u16,
    probe_address: String,
    outcome: &'static str,
    confirmed: bool,
    remote: Option<String>,
    identity: Vec<String>,
    detail: Option<String>,
}

/// Run the liveness handshake. The exit code follows the outcome.
pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut conn = args.console.connection()?;
    let outcome = conn.connect();

    let identity = conn
        .probe_reply()
        .map(|reply| reply.args.iter().map(identity_field).collect())
        .unwrap_or_default();
    let detail = conn.last_error().map(ToString::to_string);
    if let Some(detail) = &detail {
        warn!(%outcome, detail = %detail, "probe failed");
    }

    let out = ProbeOutput {
        schema_id: "https://schemas.3leaps.dev/oscprims/cli/v1/probe-result.schema.json",
        host: args.console.host.clone(),
        port: args.console.port,
        probe_address: args.console.probe_address.clone(),
        outcome: outcome.as_str(),
        confirmed: outcome.is_confirmed(),
        remote: conn.remote().map(|addr| addr.to_string()),
        identity,
        detail,
    };

    let mut pairs = vec![
        ("outcome", out.outcome.to_string()),
        ("host", format!("{}:{}", out.host, out.port)),
        ("probe", out.probe_address.clone()),
    ];
    if let Some(remote) = &out.remote {
        pairs.push(("remote", remote.clone()));
    }
    if !out.identity.is_empty() {
        pairs.push(("identity", out.identity.join(" | ")));
    }
    if let Some(detail) = &out.detail {
        pairs.push(("detail", detail.clone()));
    }
    print_report(&out, &pairs, format);

    Ok(outcome_code(outcome))
}

fn identity_field(arg: &oscprims_frame::Argument) -> String {
    match arg.as_text() {
        Some(text) => text.to_string(),
        None => arg.to_string(),
    }
}
