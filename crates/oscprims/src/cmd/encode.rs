use oscprims_codec::{to_buffer, Message};

use crate::cmd::{native_args, EncodeArgs};
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{print_datagram, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let message = Message::from_native(args.address, &native_args(&args.args))
        .map_err(|err| codec_error("invalid message", err))?;
    let datagram =
        to_buffer(&message.into()).map_err(|err| codec_error("encode failed", err))?;
    print_datagram(&datagram, format);
    Ok(SUCCESS)
}
