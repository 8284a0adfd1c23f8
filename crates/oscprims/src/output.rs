use std::io::IsTerminal;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use oscprims_codec::{Decoded, PlainValue};
use oscprims_transport::OscEvent;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct PacketOutput<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packet: Option<&'a Decoded>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: String,
}

#[derive(Serialize)]
struct DatagramOutput<'a> {
    size: usize,
    hex: &'a str,
}

/// Print one inbound event.
pub fn print_event(event: &OscEvent, format: OutputFormat) {
    let from = Some(event.sender_addr());
    match event {
        OscEvent::Message { message, .. } => {
            print_decoded(&Decoded::Message(message.clone()), from, format)
        }
        OscEvent::Bundle { bundle, .. } => {
            print_decoded(&Decoded::Bundle(bundle.clone()), from, format)
        }
        OscEvent::Error { error, .. } => print_error(&error.to_string(), from, format),
    }
}

/// Print a decoded packet, optionally tagged with its sender.
pub fn print_decoded(decoded: &Decoded, from: Option<SocketAddr>, format: OutputFormat) {
    let sender = from.map(|addr| addr.to_string());
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                kind: packet_kind(decoded),
                from: sender,
                packet: Some(decoded),
                error: None,
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
                .set_header(vec!["DEPTH", "TIMETAG", "ADDRESS", "ARGS", "FROM"]);
            let mut rows = Vec::new();
            flatten_rows(decoded, 0, &mut rows);
            for (depth, timetag, address, args) in rows {
                table.add_row(vec![
                    depth.to_string(),
                    timetag,
                    address,
                    args,
                    sender.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut rows = Vec::new();
            flatten_rows(decoded, 0, &mut rows);
            for (depth, timetag, address, args) in rows {
                let indent = "  ".repeat(depth);
                match &sender {
                    Some(sender) => println!("{indent}{timetag}{address} {args} (from {sender})"),
                    None => println!("{indent}{timetag}{address} {args}"),
                }
            }
        }
    }
}

pub fn print_error(error: &str, from: Option<SocketAddr>, format: OutputFormat) {
    let sender = from.map(|addr| addr.to_string());
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                kind: "error",
                from: sender,
                packet: None,
                error: Some(error.to_string()),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => match sender {
            Some(sender) => println!("decode error from {sender}: {error}"),
            None => println!("decode error: {error}"),
        },
    }
}

/// Print an encoded datagram.
pub fn print_datagram(datagram: &[u8], format: OutputFormat) {
    let hex = to_hex(datagram);
    match format {
        OutputFormat::Json => {
            let out = DatagramOutput {
                size: datagram.len(),
                hex: &hex,
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
                .set_header(vec!["OFFSET", "BYTES", "ASCII"]);
            for (row, chunk) in datagram.chunks(4).enumerate() {
                table.add_row(vec![
                    format!("{:04}", row * 4),
                    to_hex(chunk),
                    chunk.iter().map(|&b| printable(b)).collect::<String>(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{hex}"),
    }
}

/// Space-separated uppercase hex, one pair per byte.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex pairs, ignoring whitespace and an optional `0x` prefix.
pub fn from_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !digits.is_ascii() {
        return Err("hex input contains non-ASCII characters".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }
    digits
        .as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(pair, chunk)| {
            std::str::from_utf8(chunk)
                .ok()
                .filter(|text| text.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|text| u8::from_str_radix(text, 16).ok())
                .ok_or_else(|| {
                    format!(
                        "invalid hex pair {:?} at digit {}",
                        String::from_utf8_lossy(chunk),
                        pair * 2
                    )
                })
        })
        .collect()
}

fn packet_kind(decoded: &Decoded) -> &'static str {
    match decoded {
        Decoded::Message(_) => "message",
        Decoded::Bundle(_) => "bundle",
    }
}

type Row = (usize, String, String, String);

fn flatten_rows(decoded: &Decoded, depth: usize, rows: &mut Vec<Row>) {
    match decoded {
        Decoded::Message(message) => rows.push((
            depth,
            String::new(),
            message.address.clone(),
            message
                .args
                .iter()
                .map(describe_value)
                .collect::<Vec<_>>()
                .join(" "),
        )),
        Decoded::Bundle(bundle) => {
            let timetag = match bundle.timetag.as_unix_seconds() {
                Some(seconds) => format!("#bundle @{seconds:.6} "),
                None => "#bundle @immediate ".to_string(),
            };
            rows.push((depth, timetag, String::new(), String::new()));
            for element in &bundle.elements {
                flatten_rows(element, depth + 1, rows);
            }
        }
    }
}

fn describe_value(value: &PlainValue) -> String {
    match value {
        PlainValue::Int(v) => v.to_string(),
        PlainValue::Float(v) => format!("{v}f"),
        PlainValue::String(v) => format!("{v:?}"),
        PlainValue::Blob(v) => format!("<blob {} bytes>", v.len()),
        PlainValue::Bool(v) => v.to_string(),
        PlainValue::Nil => "nil".to_string(),
        PlainValue::Midi(m) => format!(
            "midi({:02X} {:02X} {:02X} {:02X})",
            m.port, m.status, m.data1, m.data2
        ),
    }
}

fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() {
        byte as char
    } else {
        '.'
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = [0x2F, 0x61, 0x00, 0xFF];
        assert_eq!(to_hex(&bytes), "2F 61 00 FF");
        assert_eq!(from_hex("2F 61 00 FF").unwrap(), bytes);
        assert_eq!(from_hex("0x2f6100ff").unwrap(), bytes);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(from_hex("abc").is_err());
        assert!(from_hex("zz").is_err());
        assert!(from_hex("aé0").is_err());
        assert!(from_hex("éé").is_err());
        assert!(from_hex("+f").is_err());
    }

    #[test]
    fn nested_bundle_rows_are_indented_by_depth() {
        let packet: oscprims_codec::Packet = oscprims_codec::Bundle::new(Default::default())
            .push(oscprims_codec::Message::new("/a").arg(1))
            .into();
        let mut rows = Vec::new();
        flatten_rows(&packet.into_decoded(), 0, &mut rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, "#bundle @immediate ");
        assert_eq!(rows[1], (1, String::new(), "/a".to_string(), "1".to_string()));
    }
}
