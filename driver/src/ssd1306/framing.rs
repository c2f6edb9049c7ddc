//! Control-byte framing of command and data transfers.
//!
//! Every transfer to the controller starts with a control byte. `0x80` (Co = 1, D/C# = 0) marks
//! the following byte as a command, `0x40` (Co = 0, D/C# = 1) marks the rest of the transfer as
//! display RAM data.
use crate::{OledError, OledResult};
use std::iter::once;

pub const CONTROL_COMMAND: u8 = 0x80;
pub const CONTROL_DATA: u8 = 0x40;

/// How command bytes are framed. One policy is used for every command the driver sends.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CommandFraming {
    /// Every command byte gets its own control byte: `80 c0 80 c1 80 c2 ...`.
    #[default]
    PerByte,
    /// One control byte for the whole command block: `80 c0 c1 c2 ...`.
    Block,
}

impl CommandFraming {
    /// Frames `commands` into the payload of a single transfer.
    pub fn frame(self, commands: &[u8]) -> Vec<u8> {
        match self {
            CommandFraming::PerByte => commands
                .iter()
                .flat_map(|&command| [CONTROL_COMMAND, command])
                .collect(),
            CommandFraming::Block => once(CONTROL_COMMAND)
                .chain(commands.iter().copied())
                .collect(),
        }
    }
}

/// Splits `data` into transfer payloads, each led by the data control byte.
///
/// With no `max_transfer_len` the data goes out in one transfer. Empty data produces no transfers.
pub fn frame_data(data: &[u8], max_transfer_len: Option<usize>) -> OledResult<Vec<Vec<u8>>> {
    let chunk_len = match max_transfer_len {
        None => data.len().max(1),
        Some(len) if len < 2 => {
            return Err(OledError::InvalidArgument(
                "transfer limit must leave room for at least one data byte",
            ));
        }
        Some(len) => len - 1,
    };

    Ok(data
        .chunks(chunk_len)
        .map(|chunk| once(CONTROL_DATA).chain(chunk.iter().copied()).collect())
        .collect())
}

/// A transfer payload with its framing removed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Deframed {
    Commands(Vec<u8>),
    Data(Vec<u8>),
}

/// Strips the framing from a transfer payload, the reverse of [CommandFraming::frame] and
/// [frame_data].
///
/// Returns `None` if the payload isn't framed the way `framing` frames commands.
pub fn deframe(framing: CommandFraming, payload: &[u8]) -> Option<Deframed> {
    let (&control, rest) = payload.split_first()?;
    match control {
        CONTROL_DATA => Some(Deframed::Data(rest.to_vec())),
        CONTROL_COMMAND => match framing {
            CommandFraming::Block => Some(Deframed::Commands(rest.to_vec())),
            CommandFraming::PerByte => {
                if payload.len() % 2 != 0 {
                    return None;
                }
                let mut commands = Vec::with_capacity(payload.len() / 2);
                for pair in payload.chunks(2) {
                    if pair[0] != CONTROL_COMMAND {
                        return None;
                    }
                    commands.push(pair[1]);
                }
                Some(Deframed::Commands(commands))
            }
        },
        _ => None,
    }
}
