//! stafkit CLI
//!
//! Submit requests to STAF services and decode marshalled results.

use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stafkit::{
    format_object, unmarshal_force, ApiConfig, Handle, NativeApi, Request, StafError,
    SubmitOptions, SyncOption, UnmarshalMode, Value,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stafkit")]
#[command(author = "nzinfo <li.monan@gmail.com>")]
#[command(version)]
#[command(about = "Submit STAF requests and decode marshalled results")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a request to a service
    Submit {
        /// Name to register the handle under
        #[arg(long = "handle-name", default_value = "stafkit")]
        handle_name: String,

        /// Submit mode: sync, fire-and-forget, queue, retain, queue-retain
        #[arg(long, default_value = "sync")]
        sync: SyncOption,

        /// Print the result without unmarshalling it
        #[arg(long, conflicts_with = "no_recurse")]
        raw: bool,

        /// Don't unmarshal strings nested inside the result
        #[arg(long = "no-recurse")]
        no_recurse: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Endpoint to send to, usually "local"
        location: String,

        service: String,

        /// One raw request string, or alternating option/value tokens
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
    },

    /// Decode marshalled data
    Decode {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Don't unmarshal strings nested inside the data
        #[arg(long = "no-recurse")]
        no_recurse: bool,

        /// Marshalled data; read from stdin when omitted
        data: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STAFKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            // Multi-line result text isn't part of the one-line message.
            if let Some(extra) = e.downcast_ref::<StafError>().and_then(StafError::extra) {
                if extra.contains('\n') {
                    eprintln!("{}", extra);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Submit {
            handle_name,
            sync,
            raw,
            no_recurse,
            json,
            location,
            service,
            request,
        } => {
            let request = if request.len() == 1 {
                Request::from(request.concat())
            } else {
                Request::Tokens(request)
            };
            let options = SubmitOptions::default()
                .sync(sync)
                .unmarshal(mode(raw, no_recurse));

            let api = NativeApi::load(&ApiConfig::from_env())?;
            let handle = Handle::register(Arc::new(api), &handle_name)?;
            let result = handle.submit_with(&location, &service, request, options)?;
            print_value(&result, json)
        }
        Command::Decode {
            json,
            no_recurse,
            data,
        } => {
            let data = match data {
                Some(d) => d,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read stdin")?;
                    buf.trim_end_matches(['\r', '\n']).to_string()
                }
            };
            let value = unmarshal_force(&data, mode(false, no_recurse))?;
            print_value(&value, json)
        }
    }
}

fn mode(raw: bool, no_recurse: bool) -> UnmarshalMode {
    if raw {
        UnmarshalMode::None
    } else if no_recurse {
        UnmarshalMode::NonRecursive
    } else {
        UnmarshalMode::Recursive
    }
}

/// JSON output recurses once per nesting level.
const JSON_DEPTH_LIMIT: usize = 512;

fn print_value(value: &Value, json: bool) -> anyhow::Result<()> {
    if json {
        let depth = value.depth();
        if depth > JSON_DEPTH_LIMIT {
            anyhow::bail!(
                "result nests {} levels deep, over the JSON limit of {}; use text output",
                depth,
                JSON_DEPTH_LIMIT
            );
        }
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", format_object(value));
    }
    Ok(())
}
