use crate::ssd1306::config::Ssd1306Config;
use crate::ssd1306::driver::{
    AddressingMode, DisplayMode, PowerMode, SSD1306Driver, encode_clock, opcode,
};
use crate::ssd1306::framing::{CommandFraming, frame_data};
use crate::{Delay, GpioOutput, I2cBus, OledError, OledResult};
use log::{debug, info, trace, warn};

/// Shortest low pulse on the reset line. The datasheet asks for at least 3 us; 100 us leaves room
/// for slow lines while staying far below the 100 ms upper bound.
const RESET_PULSE_US: u32 = 100;

/// Time given to the panel to go dark before its supply is cut.
const POWER_DOWN_SETTLE_MS: u32 = 10;

/// Where the driver is in bringing the controller up. Only ever moves forward, except that
/// [SSD1306Driver::reset], a power cycle or a failed initialization sends it back to the start.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub enum InitState {
    #[default]
    Uninitialized,
    PowerApplied,
    RegistersConfigured,
    Cleared,
    Ready,
}

/// I2cSSD1306Driver drives an SSD1306 controller over a two-wire bus.
///
/// The bus is borrowed exclusively for the lifetime of the driver; every call blocks until its
/// transfers are done. The driver is not meant to be shared between threads. Wrap it in a mutex
/// if it has to be.
///
/// Commands are framed according to [Ssd1306Config::framing]. Data is always framed as one
/// block, split into several transfers if the bus reports a transfer limit.
#[derive(Debug)]
pub struct I2cSSD1306Driver<'a> {
    bus: &'a mut dyn I2cBus,
    pin_power: Option<&'a dyn GpioOutput>,
    pin_reset: Option<&'a dyn GpioOutput>,
    delay: &'a mut dyn Delay,
    config: Ssd1306Config,

    state: InitState,
    power_state: PowerMode,
    addressing_mode: AddressingMode,
    display_mode: DisplayMode,
    osc_freq: u8,
    clock_div: u8,
    cursor: (u8, u8),
}

impl<'a> I2cSSD1306Driver<'a> {
    /// Creates a new I2cSSD1306Driver. Nothing is sent until [SSD1306Driver::initialize] is called.
    ///
    /// # Parameters
    ///
    /// - `bus`: The bus the controller sits on.
    /// - `pin_power`: Optional supply enable line, driven high to power the module. Without it,
    ///   the module is assumed to be powered all the time.
    /// - `pin_reset`: Optional reset line, active low. Without it, the reset pin of the module has
    ///   to be tied high (or to an RC network).
    /// - `delay`: Used for the reset pulse and the power-down settle time.
    /// - `config`: The module variant.
    ///
    /// # Errors
    ///
    /// - `OledError::InvalidArgument` if the configuration doesn't validate.
    pub fn new(
        bus: &'a mut dyn I2cBus,
        pin_power: Option<&'a dyn GpioOutput>,
        pin_reset: Option<&'a dyn GpioOutput>,
        delay: &'a mut dyn Delay,
        config: Ssd1306Config,
    ) -> OledResult<Self> {
        config.validate()?;

        Ok(I2cSSD1306Driver {
            bus,
            pin_power,
            pin_reset,
            delay,
            osc_freq: config.osc_freq,
            clock_div: config.clock_div,
            config,
            state: InitState::Uninitialized,
            power_state: PowerMode::Down,
            addressing_mode: AddressingMode::Horizontal,
            display_mode: DisplayMode::Normal,
            cursor: (0, 0),
        })
    }

    pub fn config(&self) -> &Ssd1306Config {
        &self.config
    }

    pub fn width(&self) -> u8 {
        self.config.width
    }

    pub fn height(&self) -> u8 {
        self.config.height
    }

    pub fn address(&self) -> u8 {
        self.config.address
    }

    pub fn framing(&self) -> CommandFraming {
        self.config.framing
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == InitState::Ready
    }

    pub fn power_state(&self) -> PowerMode {
        self.power_state
    }

    pub fn addressing_mode(&self) -> AddressingMode {
        self.addressing_mode
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn osc_freq(&self) -> u8 {
        self.osc_freq
    }

    pub fn clock_div(&self) -> u8 {
        self.clock_div
    }

    /// Gets the last position set, as (column, page).
    ///
    /// The controller advances its own pointer as data is written; this is not tracked.
    pub fn cursor(&self) -> (u8, u8) {
        self.cursor
    }

    /// Sends one transfer to the controller.
    fn send(&mut self, payload: &[u8]) -> OledResult<()> {
        trace!(
            "Sending {} bytes to {:#04x}, control: {:#04x}",
            payload.len(),
            self.config.address,
            payload.first().copied().unwrap_or_default()
        );
        self.bus.send(self.config.address, payload)?;
        Ok(())
    }

    /// Rejects bus traffic before the initialization sequence has started.
    fn ensure_started(&self) -> OledResult<()> {
        if self.state == InitState::Uninitialized {
            warn!("Rejecting bus traffic, the controller is not initialized");
            return Err(OledError::NotReady);
        }
        Ok(())
    }

    /// Pulls the reset line low for [RESET_PULSE_US], if there is one.
    fn pulse_reset(&mut self) -> OledResult<()> {
        if let Some(pin_reset) = self.pin_reset {
            debug!("Pulsing reset line");
            pin_reset.write(false)?;
            self.delay.delay_us(RESET_PULSE_US);
            pin_reset.write(true)?;
        }
        Ok(())
    }

    /// Brings the cache in line with the controller defaults after a reset or power loss:
    /// display off, horizontal addressing, RAM shown as is, cursor at the origin.
    fn forget_state(&mut self) {
        self.state = InitState::Uninitialized;
        self.power_state = PowerMode::Down;
        self.addressing_mode = AddressingMode::Horizontal;
        self.display_mode = DisplayMode::Normal;
        self.cursor = (0, 0);
    }

    fn run_init_sequence(&mut self) -> OledResult<()> {
        let config = self.config;

        debug!("Applying power");
        self.power_on()?;
        self.state = InitState::PowerApplied;

        debug!("Configuring registers");
        self.set_power(PowerMode::Down)?;
        self.set_mux_ratio(config.height)?;
        self.set_display_offset(0)?;
        self.set_start_line(0)?;
        self.set_segment_remap(config.segment_remap)?;
        self.set_com_scan_remap(config.com_scan_remap)?;
        self.set_com_pins_config(config.com_alt_config, config.com_lr_remap)?;
        self.set_contrast(config.contrast)?;
        self.set_osc_freq_clock_div(config.osc_freq, config.clock_div)?;
        self.set_charge_pump(config.charge_pump)?;
        self.set_addressing_mode(AddressingMode::Horizontal)?;
        self.set_precharge_period(config.precharge.0, config.precharge.1)?;
        self.set_vcomh_deselect_level(config.vcomh_level)?;
        self.set_display_mode(DisplayMode::Normal)?;
        self.state = InitState::RegistersConfigured;

        debug!("Clearing display RAM");
        self.fill_zero()?;
        self.state = InitState::Cleared;

        self.position(0, 0)?;
        self.state = InitState::Ready;
        Ok(())
    }

    /// Writes `width * height / 8` zero bytes starting at (0, 0).
    ///
    /// With page addressing the column pointer never leaves its page, so each page is cleared on
    /// its own.
    fn fill_zero(&mut self) -> OledResult<()> {
        match self.addressing_mode {
            AddressingMode::Horizontal | AddressingMode::Vertical => {
                self.position(0, 0)?;
                let zeros = vec![0u8; self.config.buffer_size()];
                self.write_pixels(&zeros)
            }
            AddressingMode::Page => {
                let zeros = vec![0u8; self.config.width as usize];
                for page in 0..self.config.pages() {
                    self.position(0, page)?;
                    self.write_pixels(&zeros)?;
                }
                Ok(())
            }
        }
    }
}

impl SSD1306Driver for I2cSSD1306Driver<'_> {
    /// Initializes the controller.
    ///
    /// First, it enables the supply line and pulses the reset line, whichever of them exist.
    ///
    /// Then it programs the registers in this order, which follows the application note in the
    /// datasheet:
    /// - puts the panel to sleep,
    /// - sets the multiplex ratio to the panel height,
    /// - sets display offset and start line to 0,
    /// - sets segment remap and COM scan direction for the mounting orientation,
    /// - sets the COM pins configuration for the module,
    /// - sets the contrast,
    /// - sets oscillator frequency and clock divider (one register),
    /// - sets the charge pump,
    /// - selects horizontal addressing,
    /// - sets the pre-charge period and the Vcomh deselect level,
    /// - selects the normal display mode, which also turns the panel on.
    ///
    /// Finally it zeroes the display RAM and moves the cursor to (0, 0).
    ///
    /// If any step fails, the controller is left in an unknown state and the driver goes back to
    /// [InitState::Uninitialized]. Call [SSD1306Driver::reset] and initialize again.
    fn initialize(&mut self) -> OledResult<()> {
        let result = self.run_init_sequence();
        match &result {
            Ok(()) => info!(
                "SSD1306 {}x{} at {:#04x} ready",
                self.config.width, self.config.height, self.config.address
            ),
            Err(e) => {
                warn!("Initialization failed in state {:?}: {}", self.state, e);
                self.state = InitState::Uninitialized;
            }
        }
        result
    }

    fn set_power(&mut self, mode: PowerMode) -> OledResult<()> {
        self.write_command(&[mode.opcode()])?;
        self.power_state = mode;
        Ok(())
    }

    fn set_addressing_mode(&mut self, mode: AddressingMode) -> OledResult<()> {
        self.write_command(&[opcode::SET_ADDRESSING_MODE, mode.value()])?;
        self.addressing_mode = mode;
        Ok(())
    }

    fn set_display_mode(&mut self, mode: DisplayMode) -> OledResult<()> {
        self.write_command(mode.commands())?;
        self.display_mode = mode;
        if let Some(power) = mode.power_effect() {
            self.power_state = power;
        }
        Ok(())
    }

    fn set_osc_freq(&mut self, freq: u8, apply: bool) -> OledResult<()> {
        let value = encode_clock(freq, self.clock_div)?;
        if apply {
            self.write_command(&[opcode::SET_CLOCK, value])?;
        }
        self.osc_freq = freq;
        Ok(())
    }

    fn set_clock_div(&mut self, div: u8, apply: bool) -> OledResult<()> {
        let value = encode_clock(self.osc_freq, div)?;
        if apply {
            self.write_command(&[opcode::SET_CLOCK, value])?;
        }
        self.clock_div = div;
        Ok(())
    }

    fn set_osc_freq_clock_div(&mut self, freq: u8, div: u8) -> OledResult<()> {
        let value = encode_clock(freq, div)?;
        self.write_command(&[opcode::SET_CLOCK, value])?;
        self.osc_freq = freq;
        self.clock_div = div;
        Ok(())
    }

    fn apply_osc_freq_clock_div(&mut self) -> OledResult<()> {
        let value = encode_clock(self.osc_freq, self.clock_div)?;
        self.write_command(&[opcode::SET_CLOCK, value])
    }

    /// Moves the cursor to column `x`, page `y`.
    ///
    /// With horizontal or vertical addressing this sets the column and page windows, starting at
    /// the cursor and ending at the last column and page: `21h x end 22h y end`. The window also
    /// tells the controller where to wrap. With page addressing the window registers are ignored,
    /// so it sets page and column start instead: `B0h|y 00h|(x & 0Fh) 10h|(x >> 4)`.
    fn position(&mut self, x: u8, y: u8) -> OledResult<()> {
        if x >= self.config.width {
            return Err(OledError::InvalidArgument("column is outside the display"));
        }
        if y >= self.config.pages() {
            return Err(OledError::InvalidArgument("page is outside the display"));
        }

        match self.addressing_mode {
            AddressingMode::Horizontal | AddressingMode::Vertical => self.write_command(&[
                opcode::SET_COLUMN_ADDRESS,
                x,
                self.config.width - 1,
                opcode::SET_PAGE_ADDRESS,
                y,
                self.config.pages() - 1,
            ])?,
            AddressingMode::Page => self.write_command(&[
                opcode::SET_PAGE_START | y,
                opcode::SET_LOWER_COLUMN_START | (x & 0x0F),
                opcode::SET_HIGHER_COLUMN_START | (x >> 4),
            ])?,
        }

        self.cursor = (x, y);
        Ok(())
    }

    /// Writes `width * height / 8` zero bytes starting at (0, 0), then positions at (0, 0) again.
    fn clear(&mut self) -> OledResult<()> {
        self.fill_zero()?;
        self.position(0, 0)
    }

    /// Drives the supply line high, if there is one, and pulses the reset line if configured to.
    ///
    /// A reset puts the controller back into its defaults, so after it the driver needs to be
    /// initialized again.
    fn power_on(&mut self) -> OledResult<()> {
        if let Some(pin_power) = self.pin_power {
            debug!("Enabling supply line");
            pin_power.write(true)?;
        }
        if self.config.reset_on_power_on && self.pin_reset.is_some() {
            self.reset()?;
        }
        Ok(())
    }

    /// Clears the RAM, puts the panel to sleep and waits [POWER_DOWN_SETTLE_MS] before dropping the
    /// supply line, so nothing is left on the panel when the supply goes away.
    ///
    /// Without a supply line, the controller keeps its configuration and can be woken up with
    /// [SSD1306Driver::set_power]. With one, it has to be initialized again.
    ///
    /// If the driver is not initialized (for example after a failed [SSD1306Driver::initialize]),
    /// the controller state is unknown, so nothing is sent. The supply line is still released.
    fn power_off(&mut self) -> OledResult<()> {
        if self.state == InitState::Uninitialized {
            debug!("Controller not initialized, skipping blanking");
        } else {
            self.clear()?;
            self.set_power(PowerMode::Down)?;
        }
        self.delay.delay_ms(POWER_DOWN_SETTLE_MS);
        if let Some(pin_power) = self.pin_power {
            debug!("Disabling supply line");
            pin_power.write(false)?;
            self.forget_state();
        }
        Ok(())
    }

    /// Pulses the reset line and resynchronizes the cache with the controller's reset defaults.
    ///
    /// Without a reset line, no pulse is issued, but the cache is reset all the same and the
    /// driver expects to be initialized again.
    fn reset(&mut self) -> OledResult<()> {
        self.pulse_reset()?;
        self.forget_state();
        Ok(())
    }

    fn write_command(&mut self, commands: &[u8]) -> OledResult<()> {
        self.ensure_started()?;
        if commands.is_empty() {
            return Ok(());
        }
        let payload = self.config.framing.frame(commands);
        self.send(&payload)
    }

    fn write_pixels(&mut self, pixels: &[u8]) -> OledResult<()> {
        self.ensure_started()?;
        let fragments = frame_data(pixels, self.bus.max_transfer_len())?;
        if fragments.len() > 1 {
            trace!(
                "Splitting {} data bytes into {} transfers",
                pixels.len(),
                fragments.len()
            );
        }
        for fragment in fragments {
            self.send(&fragment)?;
        }
        Ok(())
    }
}
