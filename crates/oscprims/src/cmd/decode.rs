use oscprims_codec::decode;

use crate::cmd::DecodeArgs;
use crate::exit::{codec_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{from_hex, print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let datagram = from_hex(&args.hex)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex: {err}")))?;
    let decoded = decode(&datagram).map_err(|err| codec_error("decode failed", err))?;
    print_decoded(&decoded, None, format);
    Ok(SUCCESS)
}
