use serde::Serialize;

use crate::cmd::get::no_reply;
use crate::cmd::CopyArgs;
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat};

#[derive(Serialize)]
struct CopyOutput<'a> {
    schema_id: &'static str,
    from: &'a str,
    to: &'a str,
    copied: bool,
}

pub fn run(args: CopyArgs, format: OutputFormat) -> CliResult<i32> {
    let mut conn = args.console.connect()?;

    let copied = conn
        .copy_value(&args.from, &args.to)
        .map_err(|err| peer_error("copy failed", err))?;
    if !copied {
        return Err(no_reply(&args.from, args.console.timeout));
    }

    let out = CopyOutput {
        schema_id: "https://schemas.3leaps.dev/oscprims/cli/v1/copy-result.schema.json",
        from: &args.from,
        to: &args.to,
        copied,
    };
    print_report(
        &out,
        &[
            ("from", args.from.clone()),
            ("to", args.to.clone()),
            ("copied", copied.to_string()),
        ],
        format,
    );
    Ok(SUCCESS)
}
