//! # Device Configuration Commands
//!
//! Besides the cyclic status frames, the chargers answer a small command set
//! used to read and write their configuration blocks: memory names and
//! setups, channel setup, the device user name and a few data tables.
//!
//! Every command is a framed ASCII sequence:
//!
//! ```text
//! read:   0C '8' k i i c c c c 0D            -> 0C data... c c c c 0D 06
//! write:  0C '0' k i i data... c c c c 0D    -> 06 (ACK) or 15 (NAK)
//! ```
//!
//! `k` selects the block, `ii` is a two-digit hex index (memory or channel
//! number). The device has to be switched into configuration mode with
//! [`RESET_CONFIG`] first and back with [`RESET`] afterwards.

use crate::constants::{ACK, FIELD_LEN, FRAME_BEGIN, FRAME_END, FRAME_READ_TIMEOUT, NAK};
use crate::error::UltramatError;
use crate::logging::frame_to_log_string;
use crate::protocol::frame::build_frame;
use crate::protocol::reader::FrameReader;
use crate::protocol::serial::Transport;
use crate::util::hex::{ascii_hex_u16, ascii_hex_u8, parse_ascii_hex};
use nom::bytes::complete::{tag, take};
use nom::combinator::{all_consuming, map_res};
use nom::multi::many0;
use nom::IResult;

/// Leaves configuration mode and resumes cyclic status output.
pub const RESET: [u8; 10] = [0x0C, 0x43, 0x30, 0x30, 0x30, 0x30, 0x30, 0x44, 0x33, 0x0D];

/// Enters configuration mode.
pub const RESET_CONFIG: [u8; 10] = [0x0C, 0x41, 0x37, 0x30, 0x30, 0x30, 0x30, 0x44, 0x38, 0x0D];

/// Length of memory and device names.
pub const NAME_LEN: usize = 16;

/// Number of battery memories.
pub const MEMORY_COUNT: u8 = 40;

const READ_PREFIX: u8 = b'8';
const WRITE_PREFIX: u8 = b'0';
const ANSWER_OVERHEAD: usize = 7;
const USER_NAME_READ_INDEX: u8 = 2;
const USER_NAME_WRITE_INDEX: u8 = 0;

/// Configuration blocks addressable by the command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigBlock {
    MemoryName,
    MemorySetup,
    StepChargeSetup,
    CycleData,
    TraceData,
    TireHeater,
    MotorRun,
    ChannelSetup,
    DeviceName,
    GraphicsData,
}

impl ConfigBlock {
    pub const ALL: [ConfigBlock; 10] = [
        ConfigBlock::MemoryName,
        ConfigBlock::MemorySetup,
        ConfigBlock::StepChargeSetup,
        ConfigBlock::CycleData,
        ConfigBlock::TraceData,
        ConfigBlock::TireHeater,
        ConfigBlock::MotorRun,
        ConfigBlock::ChannelSetup,
        ConfigBlock::DeviceName,
        ConfigBlock::GraphicsData,
    ];

    /// ASCII selector character, `'0'` to `'9'`.
    pub fn code(self) -> u8 {
        b'0' + self as u8
    }

    /// Number of 4-digit words in the answer; `None` for name blocks and
    /// blocks without a fixed size.
    pub fn word_count(self, index: u8) -> Option<usize> {
        match self {
            ConfigBlock::MemorySetup => Some(28),
            ConfigBlock::StepChargeSetup => Some(20),
            ConfigBlock::CycleData => Some(121),
            ConfigBlock::TraceData => Some(6),
            ConfigBlock::TireHeater => Some(8),
            ConfigBlock::MotorRun => Some(17),
            ConfigBlock::ChannelSetup if index == 2 => Some(4),
            ConfigBlock::ChannelSetup => Some(16),
            ConfigBlock::MemoryName | ConfigBlock::DeviceName | ConfigBlock::GraphicsData => None,
        }
    }

    /// Builds the read command for `index`.
    pub fn read_command(self, index: u8) -> Vec<u8> {
        let idx = ascii_hex_u8(index);
        build_frame(&[READ_PREFIX, self.code(), idx[0], idx[1]])
    }

    /// Builds the write command carrying `data` for `index`.
    pub fn write_command(self, index: u8, data: &[u8]) -> Vec<u8> {
        let idx = ascii_hex_u8(index);
        let mut payload = Vec::with_capacity(data.len() + 4);
        payload.extend_from_slice(&[WRITE_PREFIX, self.code(), idx[0], idx[1]]);
        payload.extend_from_slice(data);
        build_frame(&payload)
    }
}

/// Total length of an answer carrying `data_len` data characters.
pub fn answer_len(data_len: usize) -> usize {
    data_len + ANSWER_OVERHEAD
}

/// A configuration block as read from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigData {
    /// The data characters exactly as received
    pub raw: String,
    /// The data decoded as 16-bit words
    pub words: Vec<u16>,
}

fn hex_word(input: &[u8]) -> IResult<&[u8], u16> {
    map_res(take(FIELD_LEN), parse_ascii_hex)(input)
}

/// Splits an answer into its data characters.
pub fn parse_answer(input: &[u8], data_len: usize) -> IResult<&[u8], &[u8]> {
    let (input, _) = tag(&[FRAME_BEGIN][..])(input)?;
    let (input, data) = take(data_len)(input)?;
    let (input, _checksum) = take(FIELD_LEN)(input)?;
    let (input, _) = tag(&[FRAME_END, ACK][..])(input)?;
    Ok((input, data))
}

/// Decodes a run of 4-digit ASCII-hex words.
pub fn parse_words(data: &[u8]) -> Result<Vec<u16>, UltramatError> {
    all_consuming(many0(hex_word))(data)
        .map(|(_, words)| words)
        .map_err(|e| UltramatError::Framing(format!("malformed configuration words: {e:?}")))
}

/// Renders words as the 4-digit ASCII-hex payload of a write command.
pub fn encode_words(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|&w| ascii_hex_u16(w)).collect()
}

fn encode_name(name: &str) -> Result<Vec<u8>, UltramatError> {
    if !name.is_ascii() {
        return Err(UltramatError::Config(format!("name {name:?} is not ASCII")));
    }
    if name.len() > NAME_LEN {
        return Err(UltramatError::Config(format!(
            "name {name:?} exceeds {NAME_LEN} characters"
        )));
    }
    Ok(format!("{name:<width$}", width = NAME_LEN).into_bytes())
}

fn decode_name(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

/// Configuration command client owning a transport.
pub struct ConfigClient<T: Transport> {
    transport: T,
    reader: FrameReader,
}

impl<T: Transport> ConfigClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_reader(transport, FrameReader::default())
    }

    pub fn with_reader(transport: T, reader: FrameReader) -> Self {
        ConfigClient { transport, reader }
    }

    pub fn transfer_errors(&self) -> u64 {
        self.reader.transfer_errors()
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Switches the device into configuration mode.
    pub async fn begin_config(&mut self) -> Result<(), UltramatError> {
        self.ensure_open().await?;
        self.transport.write(&RESET_CONFIG).await
    }

    /// Returns the device to cyclic status output.
    pub async fn end_config(&mut self) -> Result<(), UltramatError> {
        self.ensure_open().await?;
        self.transport.write(&RESET).await
    }

    async fn ensure_open(&mut self) -> Result<(), UltramatError> {
        if !self.transport.is_connected() {
            self.transport.open().await?;
        }
        Ok(())
    }

    /// Reads `data_len` data characters of a configuration block.
    ///
    /// Invalid answers (missing start byte or ACK, bad checksum) are retried
    /// with a fresh command up to the reader's retry bound.
    pub async fn read_config_data(
        &mut self,
        block: ConfigBlock,
        index: u8,
        data_len: usize,
    ) -> Result<Vec<u8>, UltramatError> {
        self.ensure_open().await?;
        let command = block.read_command(index);
        log::debug!(
            "read {:?}[{index}]: {}",
            block,
            frame_to_log_string(&command)
        );
        let expected = answer_len(data_len);
        let max_attempts = self.reader.max_sync_retries();
        let mut attempts = 0u32;
        loop {
            self.transport.write(&command).await?;
            match self.reader.read_answer(&mut self.transport, expected).await {
                Ok(answer) => {
                    let (_, data) = parse_answer(&answer, data_len).map_err(|e| {
                        UltramatError::Framing(format!("malformed answer: {e:?}"))
                    })?;
                    return Ok(data.to_vec());
                }
                Err(err) if err.is_recoverable() => {
                    attempts += 1;
                    if attempts >= max_attempts {
                        return Err(UltramatError::RetriesExhausted {
                            attempts,
                            reason: err.to_string(),
                        });
                    }
                    log::warn!("{block:?}[{index}] answer rejected, resending: {err}");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Writes a configuration block; a NAK reply is an error.
    pub async fn write_config_data(
        &mut self,
        block: ConfigBlock,
        index: u8,
        data: &[u8],
    ) -> Result<(), UltramatError> {
        self.ensure_open().await?;
        let command = block.write_command(index, data);
        log::debug!(
            "write {:?}[{index}]: {}",
            block,
            frame_to_log_string(&command)
        );
        self.transport.write(&command).await?;
        let mut reply = [0u8; 1];
        self.transport
            .read(&mut reply, FRAME_READ_TIMEOUT)
            .await?;
        if reply[0] == NAK {
            log::warn!("Writing configuration block {block:?}[{index}] failed");
            return Err(UltramatError::ConfigWriteRejected(format!("{block:?}[{index}]")));
        }
        Ok(())
    }

    /// Reads a block with a fixed word count.
    pub async fn read_words(
        &mut self,
        block: ConfigBlock,
        index: u8,
    ) -> Result<ConfigData, UltramatError> {
        let words = block.word_count(index).ok_or_else(|| {
            UltramatError::Config(format!("{block:?} has no fixed word count"))
        })?;
        let data = self.read_config_data(block, index, words * FIELD_LEN).await?;
        Ok(ConfigData {
            raw: String::from_utf8_lossy(&data).into_owned(),
            words: parse_words(&data)?,
        })
    }

    /// Writes a block of words.
    pub async fn write_words(
        &mut self,
        block: ConfigBlock,
        index: u8,
        words: &[u16],
    ) -> Result<(), UltramatError> {
        self.write_config_data(block, index, &encode_words(words)).await
    }

    pub async fn read_user_name(&mut self) -> Result<String, UltramatError> {
        let data = self
            .read_config_data(ConfigBlock::DeviceName, USER_NAME_READ_INDEX, NAME_LEN)
            .await?;
        Ok(decode_name(&data))
    }

    pub async fn write_user_name(&mut self, name: &str) -> Result<(), UltramatError> {
        let data = encode_name(name)?;
        self.write_config_data(ConfigBlock::DeviceName, USER_NAME_WRITE_INDEX, &data)
            .await
    }

    /// Reads the name of battery memory `number` (1 to 40).
    pub async fn read_memory_name(&mut self, number: u8) -> Result<String, UltramatError> {
        check_memory_number(number)?;
        let data = self
            .read_config_data(ConfigBlock::MemoryName, number, NAME_LEN)
            .await?;
        Ok(decode_name(&data))
    }

    pub async fn write_memory_name(&mut self, number: u8, name: &str) -> Result<(), UltramatError> {
        check_memory_number(number)?;
        let data = encode_name(name)?;
        self.write_config_data(ConfigBlock::MemoryName, number, &data)
            .await
    }

    pub async fn read_memory_setup(&mut self, number: u8) -> Result<ConfigData, UltramatError> {
        check_memory_number(number)?;
        self.read_words(ConfigBlock::MemorySetup, number).await
    }

    pub async fn read_step_charge_setup(&mut self, number: u8) -> Result<ConfigData, UltramatError> {
        check_memory_number(number)?;
        self.read_words(ConfigBlock::StepChargeSetup, number).await
    }

    pub async fn read_cycle_data(&mut self, number: u8) -> Result<ConfigData, UltramatError> {
        check_memory_number(number)?;
        self.read_words(ConfigBlock::CycleData, number).await
    }

    pub async fn read_trace_data(&mut self, number: u8) -> Result<ConfigData, UltramatError> {
        check_memory_number(number)?;
        self.read_words(ConfigBlock::TraceData, number).await
    }

    pub async fn read_tire_heater_setup(&mut self, number: u8) -> Result<ConfigData, UltramatError> {
        self.read_words(ConfigBlock::TireHeater, number).await
    }

    pub async fn read_motor_run_setup(&mut self, number: u8) -> Result<ConfigData, UltramatError> {
        self.read_words(ConfigBlock::MotorRun, number).await
    }

    /// Reads the setup of channel 1 (16 words) or channel 2 (4 words).
    pub async fn read_channel_setup(&mut self, channel: u8) -> Result<ConfigData, UltramatError> {
        if !(1..=2).contains(&channel) {
            return Err(UltramatError::Config(format!("no channel {channel}")));
        }
        self.read_words(ConfigBlock::ChannelSetup, channel).await
    }
}

fn check_memory_number(number: u8) -> Result<(), UltramatError> {
    if (1..=MEMORY_COUNT).contains(&number) {
        Ok(())
    } else {
        Err(UltramatError::Config(format!(
            "memory number {number} outside 1..={MEMORY_COUNT}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_command_layout() {
        let cmd = ConfigBlock::MemorySetup.read_command(0x1F);
        assert_eq!(&cmd[..5], b"\x0c811F");
        assert_eq!(cmd.len(), 10);
        assert_eq!(cmd[9], 0x0D);
        assert!(crate::protocol::frame::is_valid(&cmd));
    }

    #[test]
    fn test_read_command_zero_index_matches_template() {
        let cmd = ConfigBlock::MemoryName.read_command(0);
        assert_eq!(&cmd[..5], b"\x0c8000");
    }

    #[test]
    fn test_write_command_layout() {
        let cmd = ConfigBlock::ChannelSetup.write_command(1, b"0001");
        assert_eq!(&cmd[..9], b"\x0c07010001");
        assert_eq!(cmd.len(), 4 + 10);
        assert!(crate::protocol::frame::is_valid(&cmd));
    }

    #[test]
    fn test_block_codes() {
        let codes: Vec<u8> = ConfigBlock::ALL.iter().map(|b| b.code()).collect();
        assert_eq!(codes, b"0123456789".to_vec());
    }

    #[test]
    fn test_parse_answer_and_words() {
        let answer = b"\x0c0BB803E80000\x0d\x06";
        let (rest, data) = parse_answer(answer, 8).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parse_words(data).unwrap(), vec![3000, 1000]);
        assert!(parse_words(b"0BB").is_err());
    }

    #[test]
    fn test_name_encoding() {
        assert_eq!(encode_name("Ultra").unwrap(), b"Ultra           ".to_vec());
        assert!(encode_name("a name that is too long").is_err());
        assert_eq!(decode_name(b"LiPo 3S         "), "LiPo 3S");
    }

    #[test]
    fn test_memory_number_bounds() {
        assert!(check_memory_number(1).is_ok());
        assert!(check_memory_number(40).is_ok());
        assert!(check_memory_number(0).is_err());
        assert!(check_memory_number(41).is_err());
    }
}
