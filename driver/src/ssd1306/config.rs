//! Module-variant configuration.
//!
//! SSD1306 modules differ in panel size, bus address and how the panel is wired to the controller.
//! [Ssd1306Config] holds those differences together with the register values written during
//! initialization. The defaults describe the common 128x64 module with the internal charge pump.
use crate::ssd1306::framing::CommandFraming;
use crate::{OledError, OledResult};

/// Largest panel the controller can drive.
pub const MAX_WIDTH: u8 = 128;
pub const MAX_HEIGHT: u8 = 64;
pub const MIN_HEIGHT: u8 = 16;

/// Usual bus address. Modules with the SA0 pin pulled high use `0x3D`.
pub const DEFAULT_ADDRESS: u8 = 0x3C;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ssd1306Config {
    /// Panel width in pixels (columns).
    pub width: u8,
    /// Panel height in pixels (rows). Also used as the multiplex ratio.
    pub height: u8,
    /// 7-bit bus address.
    pub address: u8,
    pub framing: CommandFraming,
    /// Whether [power_on](crate::ssd1306::driver::SSD1306Driver::power_on) pulses the reset line.
    pub reset_on_power_on: bool,
    pub segment_remap: bool,
    pub com_scan_remap: bool,
    /// Alternative COM pin configuration. On for 128x64 modules, off for 128x32.
    pub com_alt_config: bool,
    pub com_lr_remap: bool,
    pub contrast: u8,
    /// Oscillator frequency, 0-15.
    pub osc_freq: u8,
    /// Display clock divide ratio, 1-16.
    pub clock_div: u8,
    /// Internal charge pump. Modules powered from an external VCC keep it off.
    pub charge_pump: bool,
    /// Pre-charge period as (phase 1, phase 2) in DCLK cycles, each 1-15.
    pub precharge: (u8, u8),
    /// Vcomh deselect level, 0 (~0.65 x VCC) to 7.
    pub vcomh_level: u8,
}

impl Default for Ssd1306Config {
    fn default() -> Self {
        Ssd1306Config {
            width: 128,
            height: 64,
            address: DEFAULT_ADDRESS,
            framing: CommandFraming::PerByte,
            reset_on_power_on: true,
            segment_remap: false,
            com_scan_remap: false,
            com_alt_config: true,
            com_lr_remap: false,
            contrast: 255,
            osc_freq: 8,
            clock_div: 1,
            charge_pump: true,
            precharge: (1, 15),
            vcomh_level: 4,
        }
    }
}

impl Ssd1306Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 128x32 module: half the rows and sequential COM pins.
    pub fn module_128x32() -> Self {
        Ssd1306Config {
            height: 32,
            com_alt_config: false,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: u8, height: u8) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_framing(mut self, framing: CommandFraming) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_reset_on_power_on(mut self, reset: bool) -> Self {
        self.reset_on_power_on = reset;
        self
    }

    /// Sets segment remap and COM scan remap together. Both on rotates the image by 180°.
    pub fn with_orientation(mut self, segment_remap: bool, com_scan_remap: bool) -> Self {
        self.segment_remap = segment_remap;
        self.com_scan_remap = com_scan_remap;
        self
    }

    pub fn with_com_pins(mut self, alt_config: bool, lr_remap: bool) -> Self {
        self.com_alt_config = alt_config;
        self.com_lr_remap = lr_remap;
        self
    }

    pub fn with_contrast(mut self, contrast: u8) -> Self {
        self.contrast = contrast;
        self
    }

    pub fn with_clock(mut self, osc_freq: u8, clock_div: u8) -> Self {
        self.osc_freq = osc_freq;
        self.clock_div = clock_div;
        self
    }

    pub fn with_charge_pump(mut self, enabled: bool) -> Self {
        self.charge_pump = enabled;
        self
    }

    pub fn with_precharge(mut self, phase1: u8, phase2: u8) -> Self {
        self.precharge = (phase1, phase2);
        self
    }

    pub fn with_vcomh_level(mut self, level: u8) -> Self {
        self.vcomh_level = level;
        self
    }

    /// Number of 8-row pages.
    pub fn pages(&self) -> u8 {
        self.height / 8
    }

    /// Size of the whole display RAM window in bytes.
    pub fn buffer_size(&self) -> usize {
        self.width as usize * self.height as usize / 8
    }

    /// Checks that every value is something the controller can be programmed with.
    pub fn validate(&self) -> OledResult<()> {
        if self.width == 0 || self.width > MAX_WIDTH {
            return Err(OledError::InvalidArgument("width must be between 1 and 128"));
        }
        if self.height % 8 != 0 || !(MIN_HEIGHT..=MAX_HEIGHT).contains(&self.height) {
            return Err(OledError::InvalidArgument(
                "height must be a multiple of 8 between 16 and 64",
            ));
        }
        if self.address > 0x7F {
            return Err(OledError::InvalidArgument("address must be a 7-bit value"));
        }
        if self.osc_freq > 15 {
            return Err(OledError::InvalidArgument("oscillator frequency must be between 0 and 15"));
        }
        if !(1..=16).contains(&self.clock_div) {
            return Err(OledError::InvalidArgument("clock divider must be between 1 and 16"));
        }
        let (phase1, phase2) = self.precharge;
        if !(1..=15).contains(&phase1) || !(1..=15).contains(&phase2) {
            return Err(OledError::InvalidArgument("pre-charge phases must be between 1 and 15"));
        }
        if self.vcomh_level > 7 {
            return Err(OledError::InvalidArgument("Vcomh level must be between 0 and 7"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_128x64_module() {
        let config = Ssd1306Config::default();
        assert_eq!((config.width, config.height), (128, 64));
        assert_eq!(config.pages(), 8);
        assert_eq!(config.buffer_size(), 1024);
        assert_eq!(config.framing, CommandFraming::PerByte);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn preset_128x32() {
        let config = Ssd1306Config::module_128x32();
        assert_eq!(config.height, 32);
        assert!(!config.com_alt_config);
        assert_eq!(config.buffer_size(), 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_dimensions() {
        for (width, height) in [(0, 64), (129, 64), (128, 60), (128, 8), (128, 72)] {
            let config = Ssd1306Config::new().with_size(width, height);
            assert!(
                matches!(config.validate(), Err(OledError::InvalidArgument(_))),
                "{}x{} should be rejected",
                width,
                height
            );
        }
    }

    #[test]
    fn rejects_out_of_domain_registers() {
        let bad = [
            Ssd1306Config::new().with_address(0x80),
            Ssd1306Config::new().with_clock(16, 1),
            Ssd1306Config::new().with_clock(8, 0),
            Ssd1306Config::new().with_clock(8, 17),
            Ssd1306Config::new().with_precharge(0, 15),
            Ssd1306Config::new().with_precharge(1, 16),
            Ssd1306Config::new().with_vcomh_level(8),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(OledError::InvalidArgument(_))));
        }
    }
}
