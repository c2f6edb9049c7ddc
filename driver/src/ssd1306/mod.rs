//! SSD1306 OLED controller module.
//!
//! See [driver::SSD1306Driver] for the register interface, [driver::I2cSSD1306Driver] for the
//! implementation over a two-wire bus, and [config::Ssd1306Config] for module variants.

pub mod config;
pub mod driver;
pub mod framing;
