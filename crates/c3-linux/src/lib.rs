//! Linux platform implementation of `c3_core::hal`'s traits: loopback UDP
//! radios, I2C/GPIO/ADC access through the kernel's `i2c-dev`/sysfs
//! interfaces, the hardware RTC, and the F-RAM-backed persistent store.
#![cfg(target_os = "linux")]

pub mod adc;
pub mod fram;
pub mod gpio;
pub mod i2c;
pub mod identity;
pub mod max7310;
pub mod mock;
pub mod net;
pub mod rtc;
pub mod shared_bus;

pub use adc::LinuxAdc;
pub use fram::{Fm24Fram, FramOdStorage};
pub use gpio::LinuxGpio;
pub use i2c::LinuxI2cBus;
pub use max7310::Max7310;
pub use net::UdpInterface;
pub use rtc::LinuxRtc;
pub use shared_bus::SharedI2cBus;
