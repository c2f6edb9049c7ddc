//! Human-readable rendering of simulated bus traffic.

use monoled_driver::sim::SimEvent;
use monoled_driver::ssd1306::driver::opcode::*;
use monoled_driver::ssd1306::framing::{CommandFraming, Deframed, deframe};

/// Number of parameter bytes following an opcode.
fn parameter_count(opcode: u8) -> usize {
    match opcode {
        SET_COLUMN_ADDRESS | SET_PAGE_ADDRESS => 2,
        SET_ADDRESSING_MODE | SET_CONTRAST | SET_CHARGE_PUMP | SET_MULTIPLEX_RATIO
        | SET_DISPLAY_OFFSET | SET_CLOCK | SET_PRECHARGE_PERIOD | SET_COM_PINS
        | SET_VCOMH_DESELECT => 1,
        _ => 0,
    }
}

fn name(opcode: u8, params: &[u8]) -> String {
    let param = |i: usize| params.get(i).copied().unwrap_or_default();
    match opcode {
        0x00..=0x0F => format!("lower column start {}", opcode & 0x0F),
        0x10..=0x1F => format!("higher column start {}", opcode & 0x0F),
        SET_ADDRESSING_MODE => match param(0) {
            0 => "addressing: horizontal".to_string(),
            1 => "addressing: vertical".to_string(),
            2 => "addressing: page".to_string(),
            other => format!("addressing: invalid ({:#04x})", other),
        },
        SET_COLUMN_ADDRESS => format!("columns {}..={}", param(0), param(1)),
        SET_PAGE_ADDRESS => format!("pages {}..={}", param(0), param(1)),
        0x40..=0x7F => format!("start line {}", opcode & 0x3F),
        SET_CONTRAST => format!("contrast {}", param(0)),
        SET_CHARGE_PUMP => match param(0) {
            CHARGE_PUMP_ENABLED => "charge pump on".to_string(),
            CHARGE_PUMP_DISABLED => "charge pump off".to_string(),
            other => format!("charge pump: invalid ({:#04x})", other),
        },
        0xA0 | 0xA1 => format!("segment remap {}", if opcode & 1 == 1 { "on" } else { "off" }),
        RESUME_FROM_RAM => "show RAM".to_string(),
        ENTIRE_DISPLAY_ON => "all pixels on".to_string(),
        NORMAL_DISPLAY => "not inverted".to_string(),
        INVERSE_DISPLAY => "inverted".to_string(),
        SET_MULTIPLEX_RATIO => format!("mux ratio {}", param(0) as u16 + 1),
        DISPLAY_OFF => "display off".to_string(),
        DISPLAY_ON => "display on".to_string(),
        0xB0..=0xB7 => format!("page start {}", opcode & 0x07),
        SET_COM_SCAN_NORMAL => "COM scan normal".to_string(),
        SET_COM_SCAN_REMAPPED => "COM scan remapped".to_string(),
        SET_DISPLAY_OFFSET => format!("display offset {}", param(0)),
        SET_CLOCK => format!(
            "oscillator {}, divider {}",
            param(0) >> 4,
            (param(0) & 0x0F) + 1
        ),
        SET_PRECHARGE_PERIOD => format!(
            "pre-charge phase 1: {}, phase 2: {}",
            param(0) & 0x0F,
            param(0) >> 4
        ),
        SET_COM_PINS => format!(
            "COM pins {}, left/right remap {}",
            if param(0) & 0x10 != 0 { "alternative" } else { "sequential" },
            if param(0) & 0x20 != 0 { "on" } else { "off" }
        ),
        SET_VCOMH_DESELECT => format!("Vcomh level {}", param(0) >> 4),
        _ => "unknown".to_string(),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a command block into single commands and describes each of them.
pub fn describe_commands(commands: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = commands;
    while let Some((&opcode, tail)) = rest.split_first() {
        let count = parameter_count(opcode).min(tail.len());
        let (params, tail) = tail.split_at(count);
        let mut bytes = vec![opcode];
        bytes.extend_from_slice(params);
        lines.push(format!("{:<12} {}", hex(&bytes), name(opcode, params)));
        rest = tail;
    }
    lines
}

fn describe_data(data: &[u8]) -> String {
    let zeros = data.iter().filter(|&&b| b == 0).count();
    if zeros == data.len() {
        format!("{} data bytes, all zero", data.len())
    } else {
        let preview = hex(&data[..data.len().min(8)]);
        let more = if data.len() > 8 { " ..." } else { "" };
        format!("{} data bytes: {}{}", data.len(), preview, more)
    }
}

/// Renders one event as one or more lines.
pub fn render(event: &SimEvent, framing: CommandFraming) -> Vec<String> {
    match event {
        SimEvent::Line { name, level } => {
            vec![format!("line  {} -> {}", name, if *level { "high" } else { "low" })]
        }
        SimEvent::Delay { us } => vec![format!("wait  {} us", us)],
        SimEvent::Transfer { address, bytes } => match deframe(framing, bytes) {
            Some(Deframed::Commands(commands)) => describe_commands(&commands)
                .into_iter()
                .map(|line| format!("cmd   @{:02X} {}", address, line))
                .collect(),
            Some(Deframed::Data(data)) => {
                vec![format!("data  @{:02X} {}", address, describe_data(&data))]
            }
            None => vec![format!("raw   @{:02X} {}", address, hex(bytes))],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_blocks_by_parameter_count() {
        let lines = describe_commands(&[0x21, 0x00, 0x7F, 0x22, 0x00, 0x07]);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("21 00 7F"));
        assert!(lines[0].ends_with("columns 0..=127"));
        assert!(lines[1].ends_with("pages 0..=7"));
    }

    #[test]
    fn names_init_registers() {
        let lines = describe_commands(&[0xD5, 0x80, 0xD9, 0xF1, 0xDA, 0x12, 0xA8, 0x3F]);
        assert!(lines[0].ends_with("oscillator 8, divider 1"));
        assert!(lines[1].ends_with("pre-charge phase 1: 1, phase 2: 15"));
        assert!(lines[2].ends_with("COM pins alternative, left/right remap off"));
        assert!(lines[3].ends_with("mux ratio 64"));
    }

    #[test]
    fn renders_per_byte_transfer() {
        let event = SimEvent::Transfer {
            address: 0x3C,
            bytes: vec![0x80, 0x81, 0x80, 0xFF],
        };
        let lines = render(&event, CommandFraming::PerByte);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("cmd   @3C 81 FF"));
        assert!(lines[0].ends_with("contrast 255"));
    }

    #[test]
    fn renders_data_summary() {
        let event = SimEvent::Transfer {
            address: 0x3C,
            bytes: vec![0x40, 0, 0, 0],
        };
        assert_eq!(
            render(&event, CommandFraming::PerByte),
            vec!["data  @3C 3 data bytes, all zero".to_string()]
        );
    }
}
