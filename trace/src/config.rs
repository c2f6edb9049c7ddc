use std::env::var_os;
use std::ffi::OsStr;
use std::num::ParseIntError;
use std::path::Path;
use dotenv::var;
use monoled_driver::ssd1306::config::Ssd1306Config;
use monoled_driver::ssd1306::framing::CommandFraming;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a number: {source}")]
    NotANumber {
        name: &'static str,
        source: ParseIntError,
    },
}

#[derive(Copy, Clone, Serialize, Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    #[default]
    PerByte,
    Block,
}

impl From<Framing> for CommandFraming {
    fn from(framing: Framing) -> Self {
        match framing {
            Framing::PerByte => CommandFraming::PerByte,
            Framing::Block => CommandFraming::Block,
        }
    }
}

/// What module to simulate and what to do with it.
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    pub width: u8,
    pub height: u8,
    pub address: u8,
    pub framing: Framing,
    /// Simulate a supply enable line.
    pub power_line: bool,
    /// Simulate a reset line.
    pub reset_line: bool,
    pub reset_on_power_on: bool,
    /// Transfer limit of the simulated bus.
    pub max_transfer_len: Option<usize>,
    pub contrast: u8,
    /// Mounted upside down.
    pub flipped: bool,
    /// Panel supplied externally: charge pump off, reset pre-charge timing.
    pub external_vcc: bool,
    /// Write a checkerboard after initialization.
    pub test_pattern: bool,
}

impl Default for Config {
    fn default() -> Self {
        let driver = Ssd1306Config::default();
        Config {
            width: driver.width,
            height: driver.height,
            address: driver.address,
            framing: Framing::PerByte,
            power_line: true,
            reset_line: true,
            reset_on_power_on: driver.reset_on_power_on,
            max_transfer_len: None,
            contrast: driver.contrast,
            flipped: false,
            external_vcc: false,
            test_pattern: true,
        }
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<u32, ConfigError> {
    let value = value.trim();
    let result = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    result.map_err(|source| ConfigError::NotANumber { name, source })
}

impl Config {
    fn path() -> &'static str {
        "monoled.json"
    }

    pub fn try_load() -> Option<Self> {
        let config_str = var_os("MONOLED_CONFIG");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new(Self::path()));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let config_str = var("MONOLED_CONFIG").unwrap_or_else(|_| Self::path().to_string());
        let config_path = Path::new(&config_str);
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Applies `MONOLED_HEIGHT`, `MONOLED_ADDRESS` and `MONOLED_MAX_TRANSFER` on top of the file.
    ///
    /// Values that don't fit their field are left for the driver to reject.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(height) = var("MONOLED_HEIGHT") {
            self.height = parse_number("MONOLED_HEIGHT", &height)?.min(u8::MAX as u32) as u8;
        }
        if let Ok(address) = var("MONOLED_ADDRESS") {
            self.address = parse_number("MONOLED_ADDRESS", &address)?.min(u8::MAX as u32) as u8;
        }
        if let Ok(max) = var("MONOLED_MAX_TRANSFER") {
            self.max_transfer_len = Some(parse_number("MONOLED_MAX_TRANSFER", &max)? as usize);
        }
        Ok(())
    }

    /// The driver configuration for the described module.
    pub fn driver_config(&self) -> Ssd1306Config {
        let mut config = if self.height == 32 {
            Ssd1306Config::module_128x32()
        } else {
            Ssd1306Config::default()
        }
        .with_size(self.width, self.height)
        .with_address(self.address)
        .with_framing(self.framing.into())
        .with_reset_on_power_on(self.reset_on_power_on)
        .with_contrast(self.contrast)
        .with_orientation(self.flipped, self.flipped);

        if self.external_vcc {
            config = config.with_charge_pump(false).with_precharge(2, 2);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_in_hex_and_decimal() {
        assert_eq!(parse_number("X", "0x3d").unwrap(), 0x3D);
        assert_eq!(parse_number("X", "0X3C").unwrap(), 0x3C);
        assert_eq!(parse_number("X", " 64 ").unwrap(), 64);
        assert!(matches!(
            parse_number("X", "sixty"),
            Err(ConfigError::NotANumber { name: "X", .. })
        ));
    }

    #[test]
    fn default_maps_to_reference_module() {
        let config = Config::default().driver_config();
        assert_eq!(config, Ssd1306Config::default());
    }

    #[test]
    fn short_flipped_external_module() {
        let config = Config {
            height: 32,
            flipped: true,
            external_vcc: true,
            framing: Framing::Block,
            ..Config::default()
        }
        .driver_config();

        assert_eq!(config.height, 32);
        assert!(!config.com_alt_config);
        assert!(config.segment_remap && config.com_scan_remap);
        assert!(!config.charge_pump);
        assert_eq!(config.precharge, (2, 2));
        assert_eq!(config.framing, CommandFraming::Block);
    }

    #[test]
    fn json_uses_defaults_for_missing_fields() {
        let config: Config =
            serde_json::from_str(r#"{ "height": 32, "framing": "block" }"#).unwrap();
        assert_eq!(config.height, 32);
        assert_eq!(config.framing, Framing::Block);
        assert_eq!(config.width, 128);
        assert!(config.power_line);
    }
}
