//! Power-domain controller: the fleet of per-node I2C GPIO-expanders plus
//! the system-level enable/fault/current-sense lines they all hang off
//! (§4.5, §11.1).
//!
//! Register-level MAX7310 encoding lives behind [`crate::hal::GpioExpander`]
//! in the platform driver; this module only knows pin *meanings*.

use crate::error::C3Error;
use crate::hal::{Adc, Gpio, GpioExpander};

pub const OPD_ADDR_MIN: u8 = 0x18;
pub const OPD_ADDR_MAX: u8 = 0x23;

// Pin bit positions common to every node's expander (§6).
pub const PIN_NOT_FAULT: u8 = 1 << 2;
pub const PIN_ENABLE: u8 = 1 << 3;
pub const PIN_CB_RESET: u8 = 1 << 4;
// Microcontroller/app-processor extra pins.
pub const PIN_BOOT_SELECT: u8 = 1 << 5;
pub const PIN_I2C_BOOTLOADER: u8 = 0b0000_0011; // SCL (bit0), SDA (bit1): microcontroller only
pub const PIN_UART_ROUTE: u8 = 1 << 7;

// Bit indices for the single-pin read-modify-write operations below (§6,
// `examples/original_source/.../drivers/max7310.py`'s `set_pin`/`clear_pin`).
const BIT_ENABLE: u8 = 3;
const BIT_CB_RESET: u8 = 4;
const BIT_BOOT_SELECT: u8 = 5;
const BIT_UART_ROUTE: u8 = 7;

const RESET_PULSE: std::time::Duration = std::time::Duration::from_millis(250);
const SUBSYSTEM_RESET_SETTLE: std::time::Duration = std::time::Duration::from_secs(10);
pub const MAX_SUBSYSTEM_RESETS: u8 = 3;

// Current-sense scaling (MAX9812-class current monitor feeding the ADC):
// milliamps = adc_raw * current_ratio / r_set, the same fixed constants the
// power-domain driver used to turn a raw ADC code into a current reading.
const CURRENT_RATIO: f32 = 965.0;
const R_SET_OHMS: f32 = 23_700.0;

/// A peripheral card's processor class, which determines its boot timeout
/// and which extra expander pins it exposes (§4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorClass {
    None,
    Microcontroller,
    AppProcessor,
}

impl ProcessorClass {
    pub fn boot_timeout_s(self) -> u32 {
        match self {
            ProcessorClass::Microcontroller => 10,
            ProcessorClass::AppProcessor => 90,
            ProcessorClass::None => 0,
        }
    }

    /// Direction mask for `configure()` (bit=1 input, bit=0 output).
    fn direction_mask(self) -> u8 {
        let mut mask = PIN_NOT_FAULT;
        if self == ProcessorClass::Microcontroller {
            mask |= PIN_I2C_BOOTLOADER;
        }
        mask
    }
}

/// The power-domain controller: one shared I2C bus of per-node expanders,
/// plus the subsystem-level enable/fault/current lines (§4.5).
pub struct Opd {
    expander: Box<dyn GpioExpander + Send>,
    sys_enable: Box<dyn Gpio + Send>,
    sys_fault: Box<dyn Gpio + Send>,
    current_adc: Box<dyn Adc + Send>,
    enabled: bool,
    subsystem_resets: u8,
    dead: bool,
}

impl Opd {
    pub fn new(
        expander: Box<dyn GpioExpander + Send>,
        sys_enable: Box<dyn Gpio + Send>,
        sys_fault: Box<dyn Gpio + Send>,
        current_adc: Box<dyn Adc + Send>,
    ) -> Self {
        Self {
            expander,
            sys_enable,
            sys_fault,
            current_adc,
            enabled: false,
            subsystem_resets: 0,
            dead: false,
        }
    }

    pub fn is_subsystem_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_subsystem_dead(&self) -> bool {
        self.dead
    }

    pub fn has_fault(&self) -> Result<bool, C3Error> {
        Ok(!self.sys_fault.is_high()?)
    }

    /// Reads the current-sense ADC channel and scales it to milliamps.
    pub fn current_ma(&mut self) -> Result<u32, C3Error> {
        let raw = self.current_adc.read_raw()?;
        Ok(((raw as f32) * CURRENT_RATIO / R_SET_OHMS) as u32)
    }

    pub fn enable_bus(&mut self) -> Result<(), C3Error> {
        if self.dead {
            return Err(C3Error::OpdDead);
        }
        self.sys_enable.set_high()?;
        self.enabled = true;
        Ok(())
    }

    pub fn disable_bus(&mut self) -> Result<(), C3Error> {
        self.sys_enable.set_low()?;
        self.enabled = false;
        Ok(())
    }

    /// Verifies the expander at `addr` responds and configures its pin
    /// directions, returning whether it was found.
    pub fn probe(&mut self, addr: u8, class: ProcessorClass) -> Result<bool, C3Error> {
        if !self.expander.is_present(addr)? {
            return Ok(false);
        }
        self.expander.configure(addr, class.direction_mask(), 0)?;
        Ok(true)
    }

    /// Sets the node's output-enable pin (and, for a microcontroller node,
    /// the boot-select pin per `bootloader_mode`), leaving every other pin
    /// on the expander's output bank untouched.
    pub fn enable(&mut self, addr: u8, class: ProcessorClass, bootloader_mode: bool) -> Result<(), C3Error> {
        if self.dead {
            return Err(C3Error::OpdDead);
        }
        self.expander.set_pin(addr, BIT_ENABLE)?;
        if class == ProcessorClass::Microcontroller {
            if bootloader_mode {
                self.expander.set_pin(addr, BIT_BOOT_SELECT)?;
            } else {
                self.expander.clear_pin(addr, BIT_BOOT_SELECT)?;
            }
        }
        Ok(())
    }

    pub fn disable(&mut self, addr: u8) -> Result<(), C3Error> {
        self.expander.clear_pin(addr, BIT_ENABLE)
    }

    /// Pulses the circuit-breaker reset pin up to `attempts` times, checking
    /// the not-fault input between pulses; returns `true` if the fault
    /// cleared.
    pub fn reset(&mut self, addr: u8, attempts: u8, sleep: impl Fn(std::time::Duration)) -> Result<bool, C3Error> {
        for _ in 0..attempts {
            self.expander.set_pin(addr, BIT_CB_RESET)?;
            sleep(RESET_PULSE);
            self.expander.clear_pin(addr, BIT_CB_RESET)?;
            let inputs = self.expander.read_inputs(addr)?;
            if inputs & PIN_NOT_FAULT != 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reads the not-fault input pin for `addr` (true = no fault asserted).
    pub fn not_fault(&mut self, addr: u8) -> Result<bool, C3Error> {
        Ok(self.expander.read_inputs(addr)? & PIN_NOT_FAULT != 0)
    }

    /// Routes (or un-routes) `addr`'s UART pin to the shared debug UART,
    /// touching only that one pin on the expander's output bank.
    pub fn uart_select(&mut self, addr: u8, enable: bool) -> Result<(), C3Error> {
        if enable {
            self.expander.set_pin(addr, BIT_UART_ROUTE)
        } else {
            self.expander.clear_pin(addr, BIT_UART_ROUTE)
        }
    }

    /// Whole-bus reset used by [`crate::node_manager`]'s subsystem
    /// self-healing (§11.1): disable, settle, re-enable. Counts toward
    /// `MAX_SUBSYSTEM_RESETS` before the subsystem is declared permanently
    /// dead.
    pub fn reset_bus(&mut self, sleep: impl Fn(std::time::Duration)) -> Result<(), C3Error> {
        self.subsystem_resets += 1;
        self.disable_bus()?;
        sleep(SUBSYSTEM_RESET_SETTLE);
        if self.subsystem_resets >= MAX_SUBSYSTEM_RESETS {
            self.dead = true;
            return Err(C3Error::OpdDead);
        }
        self.enable_bus()
    }

    pub fn clear_subsystem_resets(&mut self) {
        self.subsystem_resets = 0;
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Default)]
    pub struct MockExpander {
        pub present: BTreeMap<u8, bool>,
        pub outputs: BTreeMap<u8, u8>,
        pub inputs: BTreeMap<u8, u8>,
    }

    impl GpioExpander for MockExpander {
        fn configure(&mut self, _address: u8, _direction_mask: u8, _polarity_mask: u8) -> Result<(), C3Error> {
            Ok(())
        }
        fn set_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
            let current = self.outputs.get(&address).copied().unwrap_or(0);
            self.outputs.insert(address, current | (1 << pin));
            Ok(())
        }
        fn clear_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
            let current = self.outputs.get(&address).copied().unwrap_or(0);
            self.outputs.insert(address, current & !(1 << pin));
            Ok(())
        }
        fn read_inputs(&mut self, address: u8) -> Result<u8, C3Error> {
            Ok(*self.inputs.get(&address).unwrap_or(&PIN_NOT_FAULT))
        }
        fn is_present(&mut self, address: u8) -> Result<bool, C3Error> {
            Ok(*self.present.get(&address).unwrap_or(&false))
        }
    }

    #[derive(Default)]
    pub struct MockGpio {
        pub high: bool,
    }

    impl Gpio for MockGpio {
        fn set_high(&mut self) -> Result<(), C3Error> {
            self.high = true;
            Ok(())
        }
        fn set_low(&mut self) -> Result<(), C3Error> {
            self.high = false;
            Ok(())
        }
        fn is_high(&self) -> Result<bool, C3Error> {
            Ok(self.high)
        }
    }

    #[derive(Default)]
    pub struct MockAdc {
        pub raw: u16,
    }

    impl Adc for MockAdc {
        fn read_raw(&mut self) -> Result<u16, C3Error> {
            Ok(self.raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    fn test_opd() -> (Opd, std::sync::Arc<std::sync::Mutex<MockExpander>>) {
        let expander = std::sync::Arc::new(std::sync::Mutex::new(MockExpander::default()));
        let opd = Opd::new(
            Box::new(SharedExpander(expander.clone())),
            Box::new(MockGpio::default()),
            Box::new(MockGpio { high: true }),
            Box::new(MockAdc::default()),
        );
        (opd, expander)
    }

    struct SharedExpander(std::sync::Arc<std::sync::Mutex<MockExpander>>);
    impl GpioExpander for SharedExpander {
        fn configure(&mut self, address: u8, direction_mask: u8, polarity_mask: u8) -> Result<(), C3Error> {
            self.0.lock().unwrap().configure(address, direction_mask, polarity_mask)
        }
        fn set_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
            self.0.lock().unwrap().set_pin(address, pin)
        }
        fn clear_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
            self.0.lock().unwrap().clear_pin(address, pin)
        }
        fn read_inputs(&mut self, address: u8) -> Result<u8, C3Error> {
            self.0.lock().unwrap().read_inputs(address)
        }
        fn is_present(&mut self, address: u8) -> Result<bool, C3Error> {
            self.0.lock().unwrap().is_present(address)
        }
    }

    #[test]
    fn probe_fails_when_not_present() {
        let (mut opd, _) = test_opd();
        assert!(!opd.probe(0x18, ProcessorClass::Microcontroller).unwrap());
    }

    #[test]
    fn probe_succeeds_when_present() {
        let (mut opd, expander) = test_opd();
        expander.lock().unwrap().present.insert(0x18, true);
        assert!(opd.probe(0x18, ProcessorClass::Microcontroller).unwrap());
    }

    #[test]
    fn enable_bus_fails_when_dead() {
        let (mut opd, _) = test_opd();
        opd.dead = true;
        assert_eq!(opd.enable_bus().unwrap_err(), C3Error::OpdDead);
    }

    #[test]
    fn reset_bus_marks_dead_after_max_attempts() {
        let (mut opd, _) = test_opd();
        for _ in 0..MAX_SUBSYSTEM_RESETS {
            let _ = opd.reset_bus(|_| {});
        }
        assert!(opd.is_subsystem_dead());
    }

    #[test]
    fn current_ma_scales_raw_adc_reading() {
        let (mut opd, _) = test_opd();
        let ma = opd.current_ma().unwrap();
        assert_eq!(ma, 0);
    }

    #[test]
    fn enable_and_uart_select_do_not_clobber_each_others_pins() {
        let (mut opd, expander) = test_opd();
        opd.uart_select(0x18, true).unwrap();
        opd.enable(0x18, ProcessorClass::AppProcessor, false).unwrap();
        let outputs = *expander.lock().unwrap().outputs.get(&0x18).unwrap();
        assert_ne!(outputs & PIN_UART_ROUTE, 0, "enable() must not clear the UART-route pin");
        assert_ne!(outputs & PIN_ENABLE, 0);

        opd.disable(0x18).unwrap();
        let outputs = *expander.lock().unwrap().outputs.get(&0x18).unwrap();
        assert_eq!(outputs & PIN_ENABLE, 0, "disable() must clear only the enable pin");
        assert_ne!(outputs & PIN_UART_ROUTE, 0, "disable() must not clear the UART-route pin");
    }
}
