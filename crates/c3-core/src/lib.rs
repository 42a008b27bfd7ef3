//! Platform-agnostic core of the OreSat C3 command-and-control daemon:
//! the EDL protocol stack, the mission state machine, the beacon framer,
//! the power-domain node manager, and the Object Dictionary they all share.
//!
//! Platform I/O (UDP sockets, I2C, GPIO, ADC, the F-RAM driver, the RTC)
//! lives in `c3-linux`; this crate only depends on the `hal` traits below.

pub mod ax25;
pub mod beacon;
pub mod edl;
pub mod error;
pub mod hal;
pub mod log;
pub mod node_manager;
pub mod od;
pub mod opd;
pub mod persistent;
pub mod service;
pub mod state;

pub use error::{C3Error, Result};
pub use hal::{Adc, Gpio, I2cBus, NetworkInterface, NonVolatileStorage, ObjectDictionaryStorage, Rtc};
pub use od::{ObjectDictionary, ObjectEntry, ObjectValue};
pub use service::Service;
