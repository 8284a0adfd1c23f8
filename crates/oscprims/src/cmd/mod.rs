use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message and optionally wait for the reply.
    Send(SendArgs),
    /// Bind a session to a device and print what it sends back.
    Listen(ListenArgs),
    /// Encode a message and print the datagram as hex.
    Encode(EncodeArgs),
    /// Decode a hex datagram and print the sanitized packet.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device to send to (host:port).
    pub remote: String,
    /// OSC address, e.g. /ch/01/mix/fader.
    pub address: String,
    /// Arguments as JSON values; anything that is not JSON is sent as a string.
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,
    /// Local address to bind.
    #[arg(long, env = "OSCPRIMS_BIND", default_value = "0.0.0.0:0")]
    pub bind: String,
    /// Wait for one reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device to talk to (host:port).
    #[arg(env = "OSCPRIMS_REMOTE")]
    pub remote: String,
    /// Local address to bind.
    #[arg(long, env = "OSCPRIMS_BIND", default_value = "0.0.0.0:0")]
    pub bind: String,
    /// Message sent on start so the device learns where to reply (e.g. /xremote).
    #[arg(long, value_name = "ADDRESS")]
    pub hello: Option<String>,
    /// Resend --hello at this interval (e.g. 9s).
    #[arg(long, requires = "hello")]
    pub hello_interval: Option<String>,
    /// Only print messages sent to this exact address.
    #[arg(long)]
    pub address: Option<String>,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// OSC address.
    pub address: String,
    /// Arguments as JSON values; anything that is not JSON is encoded as a string.
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Datagram as hex; whitespace is ignored.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Interpret each command-line argument as JSON, falling back to a string.
pub(crate) fn native_args(args: &[String]) -> Vec<serde_json::Value> {
    args.iter()
        .map(|arg| {
            serde_json::from_str(arg).unwrap_or_else(|_| serde_json::Value::String(arg.clone()))
        })
        .collect()
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
}

pub(crate) fn parse_socket_addr(input: &str) -> CliResult<std::net::SocketAddr> {
    input
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid bind address: {input}")))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    use std::time::Duration;

    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[test]
    fn native_args_prefer_json() {
        let args = ["0.75", "1", "true", "name", "{\"type\":\"i\",\"value\":2}"]
            .map(String::from);
        assert_eq!(
            native_args(&args),
            vec![
                json!(0.75),
                json!(1),
                json!(true),
                json!("name"),
                json!({"type": "i", "value": 2})
            ]
        );
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn bind_address_must_be_numeric() {
        assert!(parse_socket_addr("127.0.0.1:9000").is_ok());
        assert_eq!(parse_socket_addr("localhost").unwrap_err().code, USAGE);
    }
}
