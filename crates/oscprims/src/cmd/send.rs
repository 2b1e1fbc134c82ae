use oscprims_frame::{Argument, TAG_FLOAT, TAG_INT, TAG_TEXT};

use crate::cmd::get::no_reply;
use crate::cmd::SendArgs;
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let arguments = parse_arguments(args.types.as_deref(), &args.values)?;
    let mut conn = args.console.connect()?;

    if !args.wait {
        conn.command(&args.address, &arguments)
            .map_err(|err| peer_error("send failed", err))?;
        return Ok(SUCCESS);
    }

    let reply = conn
        .request(&args.address, &arguments)
        .map_err(|err| peer_error("request failed", err))?;
    match reply {
        Some(msg) => {
            print_message(&msg, conn.remote(), format);
            Ok(SUCCESS)
        }
        None => Err(no_reply(&args.address, args.console.timeout)),
    }
}

/// Build typed arguments from a tag string and positional values.
///
/// Without tags, each value is an int if it parses as one, else a float if
/// it parses as one, else text.
fn parse_arguments(types: Option<&str>, values: &[String]) -> CliResult<Vec<Argument>> {
    let Some(types) = types else {
        return Ok(values.iter().map(|value| infer_argument(value)).collect());
    };

    if types.len() != values.len() {
        return Err(CliError::new(
            USAGE,
            format!(
                "--types has {} tags but {} values were given",
                types.len(),
                values.len()
            ),
        ));
    }

    types
        .bytes()
        .zip(values)
        .map(|(tag, value)| typed_argument(tag, value))
        .collect()
}

fn typed_argument(tag: u8, value: &str) -> CliResult<Argument> {
    let invalid = |kind: &str| {
        CliError::new(
            USAGE,
            format!("value {value:?} is not a valid {kind}"),
        )
    };
    match tag {
        TAG_INT => value.parse().map(Argument::Int).map_err(|_| invalid("int32")),
        TAG_FLOAT => value
            .parse()
            .map(Argument::Float)
            .map_err(|_| invalid("float32")),
        TAG_TEXT => Ok(Argument::from(value)),
        other => Err(CliError::new(
            USAGE,
            format!("unsupported type tag {:?}", char::from(other)),
        )),
    }
}

fn infer_argument(value: &str) -> Argument {
    if let Ok(int) = value.parse::<i32>() {
        return Argument::Int(int);
    }
    match value.parse::<f32>() {
        Ok(float) if float.is_finite() => Argument::Float(float),
        _ => Argument::from(value),
    }
}
