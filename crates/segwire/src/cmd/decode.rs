use segwire_frame::{codec, Direction};

use crate::cmd::{DecodeArgs, DirectionArg};
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = parse_hex(&args.hex)?;
    let direction = match args.direction {
        DirectionArg::Command => Direction::MasterToBoard,
        DirectionArg::Feedback => Direction::BoardToMaster,
    };
    let packet = codec::decode(&frame, direction).map_err(|err| frame_error("decode failed", err))?;
    print_packet(&packet, &frame, format);
    Ok(SUCCESS)
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|chunk| {
            chunk
                .strip_prefix("0x")
                .or_else(|| chunk.strip_prefix("0X"))
                .unwrap_or(chunk)
        })
        .collect();
    hex::decode(&cleaned)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex frame: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms_accepted() {
        let expected = vec![0x55, 0xAA, 0x02, 0xFF, 0x01, 0x0A, 0xD8];
        assert_eq!(parse_hex("55aa02ff010ad8").unwrap(), expected);
        assert_eq!(parse_hex("55 AA 02 FF 01 0A D8").unwrap(), expected);
        assert_eq!(parse_hex("0x55,0xAA,0x02,0xFF,0x01,0x0A,0xD8").unwrap(), expected);
    }

    #[test]
    fn odd_hex_rejected() {
        assert_eq!(parse_hex("55a").unwrap_err().code, DATA_INVALID);
    }
}
