mod config;
mod transcript;

use dotenv::dotenv;
use log::{debug, info, warn};
use monoled_driver::GpioOutput;
use monoled_driver::sim::{RecordingBus, RecordingDelay, RecordingPin, SimLog};
use monoled_driver::ssd1306::config::Ssd1306Config;
use monoled_driver::ssd1306::driver::{I2cSSD1306Driver, SSD1306Driver};
use crate::config::Config;

/// Checkerboard of 8x8 squares, one byte per column of a page.
fn checkerboard(config: &Ssd1306Config) -> Vec<u8> {
    (0..config.pages())
        .flat_map(|page| {
            (0..config.width).map(move |column| {
                if (column / 8 + page) % 2 == 0 { 0xFF } else { 0x00 }
            })
        })
        .collect()
}

/// Prints everything recorded since `mark` under a heading and returns the new mark.
fn print_phase(title: &str, log: &SimLog, mark: usize, config: &Ssd1306Config) -> usize {
    let events = log.events();
    println!("== {} ==", title);
    for event in &events[mark.min(events.len())..] {
        for line in transcript::render(event, config.framing) {
            println!("  {}", line);
        }
    }
    events.len()
}

fn main() -> eyre::Result<()> {
    // A missing .env file is fine here, everything has a default
    dotenv().ok();
    pretty_env_logger::init();

    info!("monoled trace starting...");

    debug!("Trying to load config...");
    let mut config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    config.apply_env()?;
    debug!("{:?}", config);

    let driver_config = config.driver_config();
    info!(
        "Module {}x{} @ {:#04x}, {:?} framing",
        driver_config.width, driver_config.height, driver_config.address, driver_config.framing
    );

    let log = SimLog::new();
    let mut bus = RecordingBus::new(log.clone());
    if let Some(limit) = config.max_transfer_len {
        bus = bus.with_max_transfer_len(limit);
    }
    let mut delay = RecordingDelay::new(log.clone());
    let power_pin = config.power_line.then(|| RecordingPin::new("power", log.clone()));
    let reset_pin = config.reset_line.then(|| RecordingPin::new("reset", log.clone()));

    let mut oled = I2cSSD1306Driver::new(
        &mut bus,
        power_pin.as_ref().map(|pin| pin as &dyn GpioOutput),
        reset_pin.as_ref().map(|pin| pin as &dyn GpioOutput),
        &mut delay,
        driver_config,
    )?;
    debug!("{:?} created.", oled);

    let mut mark = 0;
    if let Err(e) = oled.initialize() {
        print_phase("initialize (failed)", &log, mark, &driver_config);
        return Err(e.into());
    }
    mark = print_phase("initialize", &log, mark, &driver_config);
    info!("{} transfers after initialization.", log.transfers().len());

    if config.test_pattern {
        oled.position(0, 0)?;
        oled.write_pixels(&checkerboard(&driver_config))?;
        mark = print_phase("test pattern", &log, mark, &driver_config);
    }

    if power_pin.is_none() {
        warn!("No power line, the module stays powered after power off.");
    }
    oled.power_off()?;
    print_phase("power off", &log, mark, &driver_config);

    info!("Done, {} bus transfers recorded.", log.transfers().len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_per_square() {
        let config = Ssd1306Config::default();
        let pattern = checkerboard(&config);
        assert_eq!(pattern.len(), config.buffer_size());
        assert_eq!(&pattern[..9], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]);
        // second page starts with an empty square
        assert_eq!(pattern[128], 0x00);
        assert_eq!(pattern[136], 0xFF);
    }
}
