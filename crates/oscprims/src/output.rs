use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use oscprims_frame::{encode, tag_name, Argument, Message};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ArgumentOutput {
    #[serde(rename = "type")]
    kind: &'static str,
    value: Value,
}

impl From<&Argument> for ArgumentOutput {
    fn from(arg: &Argument) -> Self {
        let value = match arg {
            Argument::Int(v) => Value::from(*v),
            Argument::Float(v) => Value::from(f64::from(*v)),
            Argument::Text(v) => Value::from(v.as_str()),
        };
        Self {
            kind: tag_name(arg.tag()),
            value,
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    schema_id: &'a str,
    address: &'a str,
    type_tags: String,
    args: Vec<ArgumentOutput>,
    remote: Option<String>,
    timestamp: String,
}

/// Print one received message.
pub fn print_message(msg: &Message, remote: Option<SocketAddr>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                schema_id: "https://schemas.3leaps.dev/oscprims/cli/v1/message-received.schema.json",
                address: &msg.address,
                type_tags: msg.type_tags(),
                args: msg.args.iter().map(ArgumentOutput::from).collect(),
                remote: remote.map(|addr| addr.to_string()),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "INDEX", "TYPE", "VALUE"]);
            if msg.args.is_empty() {
                table.add_row(vec![msg.address.clone(), "-".into(), "-".into(), "-".into()]);
            }
            for (index, arg) in msg.args.iter().enumerate() {
                table.add_row(vec![
                    msg.address.clone(),
                    index.to_string(),
                    tag_name(arg.tag()).to_string(),
                    arg.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{msg}");
        }
        OutputFormat::Raw => {
            if let Ok(datagram) = encode(&msg.address, &msg.type_tags(), &msg.args) {
                print_raw(&datagram);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Print a serializable report as JSON, or `pairs` as a two-column table / aligned text.
pub fn print_report<T: Serialize>(report: &T, pairs: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in pairs {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let width = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
            for (key, value) in pairs {
                println!("{key:<width$}  {value}");
            }
        }
        OutputFormat::Raw => {
            if let Some((_, value)) = pairs.first() {
                println!("{value}");
            }
        }
    }
}

pub fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
