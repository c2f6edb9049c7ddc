//! SSD1306 driver module.
//!
//! See [SSD1306Driver] trait for detailed documentation of the driver interface, and
//! [I2cSSD1306Driver] for the implementation over a two-wire bus.

mod i2c;

use crate::{OledError, OledResult};
pub use i2c::*;
use std::fmt::Debug;

/// Command opcodes of the SSD1306, as listed in chapter 9 of the datasheet.
pub mod opcode {
    pub const SET_LOWER_COLUMN_START: u8 = 0x00; // | low nibble, page addressing only
    pub const SET_HIGHER_COLUMN_START: u8 = 0x10; // | high nibble, page addressing only
    pub const SET_ADDRESSING_MODE: u8 = 0x20;
    pub const SET_COLUMN_ADDRESS: u8 = 0x21;
    pub const SET_PAGE_ADDRESS: u8 = 0x22;
    pub const SET_START_LINE: u8 = 0x40; // | line
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
    pub const SET_SEGMENT_REMAP: u8 = 0xA0; // | remap
    pub const RESUME_FROM_RAM: u8 = 0xA4;
    pub const ENTIRE_DISPLAY_ON: u8 = 0xA5;
    pub const NORMAL_DISPLAY: u8 = 0xA6;
    pub const INVERSE_DISPLAY: u8 = 0xA7;
    pub const SET_MULTIPLEX_RATIO: u8 = 0xA8;
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_PAGE_START: u8 = 0xB0; // | page, page addressing only
    pub const SET_COM_SCAN_NORMAL: u8 = 0xC0;
    pub const SET_COM_SCAN_REMAPPED: u8 = 0xC8;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_CLOCK: u8 = 0xD5;
    pub const SET_PRECHARGE_PERIOD: u8 = 0xD9;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_VCOMH_DESELECT: u8 = 0xDB;

    pub const CHARGE_PUMP_ENABLED: u8 = 0x14;
    pub const CHARGE_PUMP_DISABLED: u8 = 0x10;
}

/// The `SSD1306Driver` trait defines the register interface of the SSD1306 OLED controller.
///
/// # Commands
///
/// Every register write is a command: one opcode byte, sometimes followed by parameter bytes.
/// Commands are sent with [SSD1306Driver::write_command], display RAM contents with
/// [SSD1306Driver::write_pixels]. How these are framed on the bus is up to the implementation,
/// see [crate::ssd1306::framing].
///
/// Registers whose value the driver doesn't need to remember are encoded by the default methods
/// of this trait. Registers the driver caches (power, addressing mode, display mode, clock,
/// cursor) are implemented by the driver itself, which updates its cache only after the write
/// went through.
///
/// Every setter checks its argument first; an out-of-range value returns
/// [OledError::InvalidArgument] without sending anything.
///
/// # Memory
///
/// The display RAM is `width` columns by `height / 8` pages. Each data byte covers 8 vertically
/// stacked pixels of one column in one page, LSb on top. Where the next data byte lands depends
/// on the [AddressingMode].
///
/// # Sources
///
/// - Solomon Systech Limited,
///   [“SSD1306 128 x 64 Dot Matrix OLED/PLED Segment/Common Driver with Controller,”](https://cdn-shop.adafruit.com/datasheets/SSD1306.pdf)
///   Apr. 2008.
pub trait SSD1306Driver: Debug {
    /// Brings the controller from power-on into a known, addressable state and clears the RAM.
    /// See [I2cSSD1306Driver::initialize] for the exact sequence.
    fn initialize(&mut self) -> OledResult<()>;

    /// Wakes the panel up or puts it to sleep.
    ///
    /// Command: `AFh` (up) / `AEh` (down).
    fn set_power(&mut self, mode: PowerMode) -> OledResult<()>;

    /// Sets how the RAM address advances after each data byte.
    ///
    /// Command: `20h`, then `00h` horizontal / `01h` vertical / `02h` page.
    fn set_addressing_mode(&mut self, mode: AddressingMode) -> OledResult<()>;

    /// Sets what the panel shows. See [DisplayMode::commands] for the encoding.
    fn set_display_mode(&mut self, mode: DisplayMode) -> OledResult<()>;

    /// Stores the oscillator frequency (0-15) and, if `apply` is set, writes the clock register.
    ///
    /// The frequency shares its register with the clock divider. With `apply` unset the
    /// controller keeps running on the old value until [Self::apply_osc_freq_clock_div] is called.
    fn set_osc_freq(&mut self, freq: u8, apply: bool) -> OledResult<()>;

    /// Stores the display clock divider (1-16) and, if `apply` is set, writes the clock register.
    fn set_clock_div(&mut self, div: u8, apply: bool) -> OledResult<()>;

    /// Sets oscillator frequency and clock divider in a single register write.
    fn set_osc_freq_clock_div(&mut self, freq: u8, div: u8) -> OledResult<()>;

    /// Writes the clock register from the stored frequency and divider.
    ///
    /// Command: `D5h`, then `FFFFDDDD` where `F` is the frequency and `D` the divider minus one.
    fn apply_osc_freq_clock_div(&mut self) -> OledResult<()>;

    /// Moves the RAM write cursor to column `x`, page `y`.
    fn position(&mut self, x: u8, y: u8) -> OledResult<()>;

    /// Zeroes the whole display RAM and moves the cursor back to (0, 0).
    fn clear(&mut self) -> OledResult<()>;

    /// Enables the supply line and, if configured, pulses the reset line.
    fn power_on(&mut self) -> OledResult<()>;

    /// Blanks the panel, puts it to sleep and cuts the supply line.
    fn power_off(&mut self) -> OledResult<()>;

    /// Pulses the reset line and brings the cached register state back to the controller's
    /// reset defaults. The controller has to be initialized again afterwards.
    fn reset(&mut self) -> OledResult<()>;

    /// Sets the contrast, 0-255. Higher is brighter.
    ///
    /// Command: `81h`, then the value.
    fn set_contrast(&mut self, value: u8) -> OledResult<()> {
        self.write_command(&[opcode::SET_CONTRAST, value])
    }

    /// Sets the multiplex ratio, i.e. the number of COM lines scanned. 16-64.
    ///
    /// Command: `A8h`, then the ratio minus one.
    fn set_mux_ratio(&mut self, ratio: u8) -> OledResult<()> {
        if !(16..=64).contains(&ratio) {
            return Err(OledError::InvalidArgument("mux ratio must be between 16 and 64"));
        }
        self.write_command(&[opcode::SET_MULTIPLEX_RATIO, ratio - 1])
    }

    /// Shifts the image vertically by `offset` COM lines, 0-63.
    ///
    /// Command: `D3h`, then the offset.
    fn set_display_offset(&mut self, offset: u8) -> OledResult<()> {
        if offset > 63 {
            return Err(OledError::InvalidArgument("display offset must be between 0 and 63"));
        }
        self.write_command(&[opcode::SET_DISPLAY_OFFSET, offset])
    }

    /// Sets the RAM row shown on the first line of the panel, 0-63.
    ///
    /// Command: `01LLLLLL`.
    fn set_start_line(&mut self, line: u8) -> OledResult<()> {
        if line > 63 {
            return Err(OledError::InvalidArgument("start line must be between 0 and 63"));
        }
        self.write_command(&[opcode::SET_START_LINE | line])
    }

    /// Maps column 127 to SEG0 instead of column 0, flipping the image horizontally.
    ///
    /// Command: `A0h` (normal) / `A1h` (remapped).
    fn set_segment_remap(&mut self, remap: bool) -> OledResult<()> {
        self.write_command(&[opcode::SET_SEGMENT_REMAP | remap as u8])
    }

    /// Scans COM lines from the last to the first, flipping the image vertically.
    ///
    /// Command: `C0h` (normal) / `C8h` (remapped).
    fn set_com_scan_remap(&mut self, remap: bool) -> OledResult<()> {
        let command = if remap {
            opcode::SET_COM_SCAN_REMAPPED
        } else {
            opcode::SET_COM_SCAN_NORMAL
        };
        self.write_command(&[command])
    }

    /// Sets how the COM pins are wired to the panel rows.
    ///
    /// Command: `DAh`, then `00RA0010`.
    /// `A` is `1` for the alternative pin configuration, `0` for sequential.
    /// `R` is `1` to swap the left and right COM halves.
    fn set_com_pins_config(&mut self, alt_config: bool, lr_remap: bool) -> OledResult<()> {
        let mut value = 0b00000010;
        if alt_config {
            value |= 0b00010000;
        }
        if lr_remap {
            value |= 0b00100000;
        }
        self.write_command(&[opcode::SET_COM_PINS, value])
    }

    /// Turns the internal charge pump on or off. It has to be on when the module has no
    /// external panel supply.
    ///
    /// Command: `8Dh`, then `14h` (on) / `10h` (off).
    fn set_charge_pump(&mut self, enabled: bool) -> OledResult<()> {
        let value = if enabled {
            opcode::CHARGE_PUMP_ENABLED
        } else {
            opcode::CHARGE_PUMP_DISABLED
        };
        self.write_command(&[opcode::SET_CHARGE_PUMP, value])
    }

    /// Sets the length of both pre-charge phases in DCLK cycles, each 1-15.
    ///
    /// Command: `D9h`, then `22221111`.
    fn set_precharge_period(&mut self, phase1: u8, phase2: u8) -> OledResult<()> {
        if !(1..=15).contains(&phase1) {
            return Err(OledError::InvalidArgument("phase 1 must be between 1 and 15"));
        }
        if !(1..=15).contains(&phase2) {
            return Err(OledError::InvalidArgument("phase 2 must be between 1 and 15"));
        }
        self.write_command(&[opcode::SET_PRECHARGE_PERIOD, (phase2 << 4) | phase1])
    }

    /// Sets the Vcomh deselect level, 0 (~0.65 x VCC) to 7.
    ///
    /// Command: `DBh`, then `0LLL0000`.
    fn set_vcomh_deselect_level(&mut self, level: u8) -> OledResult<()> {
        if level > 7 {
            return Err(OledError::InvalidArgument("Vcomh level must be between 0 and 7"));
        }
        self.write_command(&[opcode::SET_VCOMH_DESELECT, level << 4])
    }

    // Low-level commands
    // Everything above ends up here.

    /// Sends raw command bytes, framed as commands, in a single transfer.
    fn write_command(&mut self, commands: &[u8]) -> OledResult<()>;

    /// Sends raw display RAM bytes at the current cursor, framed as data.
    fn write_pixels(&mut self, pixels: &[u8]) -> OledResult<()>;
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PowerMode {
    Up,
    /// Sleep mode. The controller keeps its RAM and registers.
    #[default]
    Down,
}

impl PowerMode {
    pub fn opcode(self) -> u8 {
        match self {
            PowerMode::Up => opcode::DISPLAY_ON,
            PowerMode::Down => opcode::DISPLAY_OFF,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum AddressingMode {
    /// The column advances after each byte, wrapping to the next page at the end of the window.
    #[default]
    Horizontal,
    /// The page advances after each byte, wrapping to the next column at the end of the window.
    Vertical,
    /// The column advances within the current page and wraps around in it.
    Page,
}

impl AddressingMode {
    /// The parameter byte of the addressing mode command.
    pub fn value(self) -> u8 {
        match self {
            AddressingMode::Horizontal => 0x00,
            AddressingMode::Vertical => 0x01,
            AddressingMode::Page => 0x02,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DisplayMode {
    /// Panel off.
    Blank,
    /// Every pixel lit, ignoring the RAM.
    AllOn,
    /// RAM contents, lit where the bit is set. Also turns the panel on.
    #[default]
    Normal,
    /// RAM contents, lit where the bit is clear.
    Inverse,
}

impl DisplayMode {
    /// The command bytes that select this mode.
    ///
    /// Normal has to leave the entire-display-on state, turn inversion off and turn the panel on,
    /// so it's three commands: `A4h A6h AFh`. Inverse leaves the entire-display-on state too,
    /// otherwise coming from AllOn would keep every pixel lit: `A4h A7h`.
    pub fn commands(self) -> &'static [u8] {
        match self {
            DisplayMode::Blank => &[opcode::DISPLAY_OFF],
            DisplayMode::AllOn => &[opcode::ENTIRE_DISPLAY_ON],
            DisplayMode::Normal => &[
                opcode::RESUME_FROM_RAM,
                opcode::NORMAL_DISPLAY,
                opcode::DISPLAY_ON,
            ],
            DisplayMode::Inverse => &[opcode::RESUME_FROM_RAM, opcode::INVERSE_DISPLAY],
        }
    }

    /// The power state the controller is left in after this mode is selected, if it changes it.
    pub fn power_effect(self) -> Option<PowerMode> {
        match self {
            DisplayMode::Blank => Some(PowerMode::Down),
            DisplayMode::Normal => Some(PowerMode::Up),
            DisplayMode::AllOn | DisplayMode::Inverse => None,
        }
    }
}

/// Encodes the clock register parameter from a frequency (0-15) and a divider (1-16).
pub fn encode_clock(freq: u8, div: u8) -> OledResult<u8> {
    if freq > 15 {
        return Err(OledError::InvalidArgument("oscillator frequency must be between 0 and 15"));
    }
    if !(1..=16).contains(&div) {
        return Err(OledError::InvalidArgument("clock divider must be between 1 and 16"));
    }
    Ok((freq << 4) | (div - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects commands without any bus, to check the default encoders.
    #[derive(Debug, Default)]
    struct CommandSink {
        commands: Vec<Vec<u8>>,
    }

    impl SSD1306Driver for CommandSink {
        fn initialize(&mut self) -> OledResult<()> {
            Ok(())
        }
        fn set_power(&mut self, _mode: PowerMode) -> OledResult<()> {
            Ok(())
        }
        fn set_addressing_mode(&mut self, _mode: AddressingMode) -> OledResult<()> {
            Ok(())
        }
        fn set_display_mode(&mut self, _mode: DisplayMode) -> OledResult<()> {
            Ok(())
        }
        fn set_osc_freq(&mut self, _freq: u8, _apply: bool) -> OledResult<()> {
            Ok(())
        }
        fn set_clock_div(&mut self, _div: u8, _apply: bool) -> OledResult<()> {
            Ok(())
        }
        fn set_osc_freq_clock_div(&mut self, _freq: u8, _div: u8) -> OledResult<()> {
            Ok(())
        }
        fn apply_osc_freq_clock_div(&mut self) -> OledResult<()> {
            Ok(())
        }
        fn position(&mut self, _x: u8, _y: u8) -> OledResult<()> {
            Ok(())
        }
        fn clear(&mut self) -> OledResult<()> {
            Ok(())
        }
        fn power_on(&mut self) -> OledResult<()> {
            Ok(())
        }
        fn power_off(&mut self) -> OledResult<()> {
            Ok(())
        }
        fn reset(&mut self) -> OledResult<()> {
            Ok(())
        }
        fn write_command(&mut self, commands: &[u8]) -> OledResult<()> {
            self.commands.push(commands.to_vec());
            Ok(())
        }
        fn write_pixels(&mut self, _pixels: &[u8]) -> OledResult<()> {
            Ok(())
        }
    }

    #[test]
    fn contrast_covers_full_range() {
        let mut sink = CommandSink::default();
        for value in 0..=255u8 {
            sink.set_contrast(value).unwrap();
        }
        assert_eq!(sink.commands.len(), 256);
        for (value, command) in sink.commands.iter().enumerate() {
            assert_eq!(command, &vec![0x81, value as u8]);
        }
    }

    #[test]
    fn vcomh_levels() {
        let mut sink = CommandSink::default();
        for level in 0..8u8 {
            sink.set_vcomh_deselect_level(level).unwrap();
            assert_eq!(sink.commands.last(), Some(&vec![0xDB, level << 4]));
        }
        for level in [8u8, 9, 0x70, 255] {
            assert!(matches!(
                sink.set_vcomh_deselect_level(level),
                Err(OledError::InvalidArgument(_))
            ));
        }
        assert_eq!(sink.commands.len(), 8);
    }

    #[test]
    fn clock_register_packing() {
        for freq in 0..16u8 {
            for div in 1..=16u8 {
                assert_eq!(encode_clock(freq, div), Ok((freq << 4) | (div - 1)));
            }
        }
        assert_eq!(encode_clock(8, 1), Ok(0x80));
        assert!(encode_clock(16, 1).is_err());
        assert!(encode_clock(0, 0).is_err());
        assert!(encode_clock(0, 17).is_err());
    }

    #[test]
    fn mux_offset_and_start_line() {
        let mut sink = CommandSink::default();
        sink.set_mux_ratio(64).unwrap();
        sink.set_mux_ratio(16).unwrap();
        sink.set_display_offset(63).unwrap();
        sink.set_start_line(0).unwrap();
        sink.set_start_line(63).unwrap();
        assert_eq!(
            sink.commands,
            vec![vec![0xA8, 0x3F], vec![0xA8, 0x0F], vec![0xD3, 63], vec![0x40], vec![0x7F]]
        );

        assert!(sink.set_mux_ratio(15).is_err());
        assert!(sink.set_mux_ratio(65).is_err());
        assert!(sink.set_display_offset(64).is_err());
        assert!(sink.set_start_line(64).is_err());
        assert_eq!(sink.commands.len(), 5);
    }

    #[test]
    fn orientation_and_pins() {
        let mut sink = CommandSink::default();
        sink.set_segment_remap(false).unwrap();
        sink.set_segment_remap(true).unwrap();
        sink.set_com_scan_remap(false).unwrap();
        sink.set_com_scan_remap(true).unwrap();
        sink.set_com_pins_config(false, false).unwrap();
        sink.set_com_pins_config(true, false).unwrap();
        sink.set_com_pins_config(true, true).unwrap();
        assert_eq!(
            sink.commands,
            vec![
                vec![0xA0],
                vec![0xA1],
                vec![0xC0],
                vec![0xC8],
                vec![0xDA, 0x02],
                vec![0xDA, 0x12],
                vec![0xDA, 0x32],
            ]
        );
    }

    #[test]
    fn charge_pump_and_precharge() {
        let mut sink = CommandSink::default();
        sink.set_charge_pump(true).unwrap();
        sink.set_charge_pump(false).unwrap();
        sink.set_precharge_period(1, 15).unwrap();
        sink.set_precharge_period(2, 2).unwrap();
        assert_eq!(
            sink.commands,
            vec![vec![0x8D, 0x14], vec![0x8D, 0x10], vec![0xD9, 0xF1], vec![0xD9, 0x22]]
        );
        assert!(sink.set_precharge_period(0, 2).is_err());
        assert!(sink.set_precharge_period(2, 16).is_err());
        assert_eq!(sink.commands.len(), 4);
    }

    #[test]
    fn display_mode_encodings() {
        assert_eq!(DisplayMode::Blank.commands(), &[0xAE]);
        assert_eq!(DisplayMode::AllOn.commands(), &[0xA5]);
        assert_eq!(DisplayMode::Normal.commands(), &[0xA4, 0xA6, 0xAF]);
        assert_eq!(DisplayMode::Inverse.commands(), &[0xA4, 0xA7]);
        assert_eq!(DisplayMode::Normal.power_effect(), Some(PowerMode::Up));
        assert_eq!(DisplayMode::Blank.power_effect(), Some(PowerMode::Down));
        assert_eq!(DisplayMode::Inverse.power_effect(), None);
    }
}
