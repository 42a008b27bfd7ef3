//! OreSat C3 flight computer command-and-control daemon.
//!
//! Wires the platform-agnostic core (`c3_core`) to either the real Linux
//! drivers (`c3_linux`) or the in-memory mocks, builds the Object
//! Dictionary, restores persistent state, and runs every service on its own
//! thread under a shared watchdog-petter loop.

mod clock;
mod fleet;
mod runner;
mod services;
mod shutdown;
mod watchdog;

use c3_core::beacon::BeaconBody;
use c3_core::hal::{Adc, Gpio, GpioExpander, I2cBus, ObjectDictionaryStorage, Rtc};
use c3_core::node_manager::NodeManager;
use c3_core::od::constants::{
    IDX_BEACON_DELAY, IDX_BEACON_DEST_CALLSIGN, IDX_BEACON_LAST_TIMESTAMP, IDX_BEACON_SEND_NOW,
    IDX_BEACON_SRC_CALLSIGN, IDX_EDL_LAST_TIMESTAMP, IDX_EDL_SEQUENCE_NUMBER, IDX_FLIGHT_MODE,
    IDX_HW_ID, IDX_HW_VERSION, IDX_NODE_MANAGER_NODES_DEAD, IDX_STATUS, IDX_VBATT_BP1, IDX_VBATT_BP2,
};
use c3_core::od::{AccessType, ObjectDictionary, ObjectEntry, ObjectValue};
use c3_core::opd::Opd;
use c3_core::state::ResetKind;
use c3_core::persistent;
use clap::Parser;
use services::beacon::BeaconService;
use services::edl::EdlService;
use services::node_manager::NodeManagerService;
use services::state::StateService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The OreSat C3 board's own GPIO/I2C/ADC map. Board configuration, not
/// protocol — these line/address/channel numbers have no meaning outside
/// this one deployment target.
mod board {
    pub const I2C_BUS_DEFAULT: u8 = 2;
    pub const EEPROM_ADDR: u8 = 0x52;
    pub const FRAM_ADDR_DEFAULT: u8 = 0x50;
    pub const RTC_INDEX: u8 = 0;

    pub const GPIO_ANTENNA_MONOPOLE: u32 = 60;
    pub const GPIO_ANTENNA_HELICAL: u32 = 61;
    pub const GPIO_OPD_SYS_ENABLE: u32 = 62;
    pub const GPIO_OPD_SYS_FAULT: u32 = 63;
    pub const GPIO_HW_ID_BITS: [u32; 5] = [64, 65, 66, 67, 68];

    pub const ADC_DEVICE: u32 = 0;
    pub const ADC_CHANNEL_VBATT1: u32 = 0;
    pub const ADC_CHANNEL_VBATT2: u32 = 1;
    pub const ADC_CHANNEL_OPD_CURRENT: u32 = 2;
}

/// OreSat C3 flight computer command-and-control daemon.
#[derive(Parser, Debug)]
#[command(name = "c3", about = "OreSat C3 flight computer command-and-control daemon")]
struct Cli {
    /// Spacecraft generation; selects the known node fleet (§3, §6).
    #[arg(short, long, default_value = "0.5")]
    oresat: String,

    /// Stub every hardware driver with an in-memory mock instead of talking
    /// to real I2C/GPIO/ADC/RTC devices.
    #[arg(short = 'm', long)]
    mock_hw: bool,

    /// Raise the default log level from INFO to DEBUG.
    #[arg(short, long)]
    verbose: bool,

    /// Boot-time override for `FLIGHT_MODE`, written into the OD before any
    /// service starts.
    #[arg(long)]
    flight_mode: bool,
}

/// Every trait-object handle `main` needs to build the services, bundled so
/// the mock and real setup paths can each return one value of this type.
struct Runtime {
    storage: Box<dyn ObjectDictionaryStorage + Send>,
    rtc: Box<dyn Rtc + Send>,
    monopole: Box<dyn Gpio + Send>,
    helical: Box<dyn Gpio + Send>,
    sys_enable: Box<dyn Gpio + Send>,
    sys_fault: Box<dyn Gpio + Send>,
    opd_current_adc: Box<dyn Adc + Send>,
    vbatt1_adc: Box<dyn Adc + Send>,
    vbatt2_adc: Box<dyn Adc + Send>,
    hw_id_gpios: Vec<Box<dyn Gpio + Send>>,
    expander: Box<dyn GpioExpander + Send>,
    identity_bus: Box<dyn I2cBus + Send>,
}

fn setup_mock_hw(fram_schema: Vec<(u16, ObjectValue)>) -> Runtime {
    let bus = c3_linux::SharedI2cBus::new(c3_linux::mock::MockI2cBus::default());
    let storage: Box<dyn ObjectDictionaryStorage + Send> = Box::new(c3_linux::FramOdStorage::new(
        Box::new(c3_linux::mock::MockNonVolatileStorage::new(8 * 1024)),
        fram_schema,
    ));
    Runtime {
        storage,
        rtc: Box::new(c3_linux::mock::MockRtc::default()),
        monopole: Box::new(c3_linux::mock::MockGpio::default()),
        helical: Box::new(c3_linux::mock::MockGpio::default()),
        sys_enable: Box::new(c3_linux::mock::MockGpio::default()),
        sys_fault: Box::new(c3_linux::mock::MockGpio::default()),
        opd_current_adc: Box::new(c3_linux::mock::MockAdc::default()),
        vbatt1_adc: Box::new(c3_linux::mock::MockAdc::default()),
        vbatt2_adc: Box::new(c3_linux::mock::MockAdc::default()),
        hw_id_gpios: (0..5).map(|_| -> Box<dyn Gpio + Send> { Box::new(c3_linux::mock::MockGpio::default()) }).collect(),
        expander: Box::new(c3_linux::mock::MockGpioExpander::default()),
        identity_bus: Box::new(bus),
    }
}

fn setup_real_hw(i2c_bus_num: u8, fram_addr: u8, fram_schema: Vec<(u16, ObjectValue)>) -> Runtime {
    let physical = c3_linux::LinuxI2cBus::open(i2c_bus_num).unwrap_or_else(|e| {
        log::error!("failed to open I2C bus {i2c_bus_num}: {e}");
        std::process::exit(1);
    });
    let bus = c3_linux::SharedI2cBus::new(physical);

    let fram = c3_linux::Fm24Fram::new(Box::new(bus.clone()), fram_addr);
    let storage: Box<dyn ObjectDictionaryStorage + Send> =
        Box::new(c3_linux::FramOdStorage::new(Box::new(fram), fram_schema));

    let open_gpio = |line: u32, output: bool| -> Box<dyn Gpio + Send> {
        let gpio = if output { c3_linux::LinuxGpio::new_output(line) } else { c3_linux::LinuxGpio::new_input(line) };
        Box::new(gpio.unwrap_or_else(|e| {
            log::error!("failed to configure GPIO line {line}: {e}");
            std::process::exit(1);
        }))
    };

    let hw_id_gpios = board::GPIO_HW_ID_BITS.into_iter().map(|line| open_gpio(line, false)).collect();

    Runtime {
        storage,
        rtc: Box::new(c3_linux::LinuxRtc::new(board::RTC_INDEX)),
        monopole: open_gpio(board::GPIO_ANTENNA_MONOPOLE, true),
        helical: open_gpio(board::GPIO_ANTENNA_HELICAL, true),
        sys_enable: open_gpio(board::GPIO_OPD_SYS_ENABLE, true),
        sys_fault: open_gpio(board::GPIO_OPD_SYS_FAULT, false),
        opd_current_adc: Box::new(c3_linux::LinuxAdc::new(board::ADC_DEVICE, board::ADC_CHANNEL_OPD_CURRENT)),
        vbatt1_adc: Box::new(c3_linux::LinuxAdc::new(board::ADC_DEVICE, board::ADC_CHANNEL_VBATT1)),
        vbatt2_adc: Box::new(c3_linux::LinuxAdc::new(board::ADC_DEVICE, board::ADC_CHANNEL_VBATT2)),
        hw_id_gpios,
        expander: Box::new(c3_linux::Max7310::new(Box::new(bus.clone()))),
        identity_bus: Box::new(bus),
    }
}

/// The ordered set of telemetry fields a beacon packet carries: a small,
/// fixed snapshot of mission and health state rather than the whole
/// dictionary.
fn beacon_fields() -> Vec<u16> {
    vec![
        IDX_STATUS,
        IDX_VBATT_BP1,
        IDX_VBATT_BP2,
        IDX_NODE_MANAGER_NODES_DEAD,
        IDX_EDL_LAST_TIMESTAMP,
        IDX_EDL_SEQUENCE_NUMBER,
        IDX_BEACON_LAST_TIMESTAMP,
        IDX_BEACON_DELAY,
        IDX_BEACON_SRC_CALLSIGN,
        IDX_BEACON_DEST_CALLSIGN,
    ]
}

/// The persistent-entry type template `FramOdStorage` needs, captured once
/// from the freshly built (pre-restore) dictionary so every entry's default
/// value doubles as its encode/decode schema.
fn persistent_schema(od: &ObjectDictionary) -> Vec<(u16, ObjectValue)> {
    od.persistent_entries().map(|e| (e.index, e.default_value.clone())).collect()
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let version = match fleet::OresatVersion::parse(&cli.oresat) {
        Some(v) => v,
        None => {
            log::error!("invalid --oresat value {:?} (expected 0, 0.5, or 1)", cli.oresat);
            std::process::exit(1);
        }
    };

    let mock_hw = cli.mock_hw || std::env::var("MOCK_HW").is_ok();
    let i2c_bus_num: u8 = std::env::var("I2C_BUS_NUM").ok().and_then(|v| v.parse().ok()).unwrap_or(board::I2C_BUS_DEFAULT);
    let fram_addr: u8 = std::env::var("FRAM_ADDR").ok().and_then(|v| v.parse().ok()).unwrap_or(board::FRAM_ADDR_DEFAULT);

    let mut od = ObjectDictionary::new();
    c3_core::state::register_entries(&mut od);
    c3_core::beacon::register_entries(&mut od);
    c3_core::node_manager::register_entries(&mut od);
    c3_core::edl::register_entries(&mut od);
    od.insert(ObjectEntry::new(IDX_HW_VERSION, "HW_VERSION", ObjectValue::VisibleString(String::new()), AccessType::ReadOnly));
    od.insert(ObjectEntry::new(IDX_HW_ID, "HW_ID", ObjectValue::U8(0), AccessType::ReadOnly));

    let fram_schema = persistent_schema(&od);
    let mut rt = if mock_hw { setup_mock_hw(fram_schema) } else { setup_real_hw(i2c_bus_num, fram_addr, fram_schema) };

    od.write_internal(IDX_FLIGHT_MODE, ObjectValue::Bool(cli.flight_mode)).expect("FLIGHT_MODE entry always registered");
    let flight_mode = cli.flight_mode;

    // Align the system clock from the RTC before any service reads the
    // time. Non-fatal: a non-root `--mock-hw` bench run is expected to fail
    // here.
    match rt.rtc.unix_time() {
        Ok(unix_s) => {
            if let Err(e) = c3_linux::rtc::align_system_clock(unix_s) {
                log::warn!("failed to align system clock from RTC: {e}");
            }
        }
        Err(e) => log::warn!("failed to read RTC at startup: {e}"),
    }

    // Hardware identity readback, once at startup.
    match c3_linux::identity::read_hw_version(&mut *rt.identity_bus, board::EEPROM_ADDR) {
        Ok(hw_version) => {
            let hw_id_refs: Vec<&dyn Gpio> = rt.hw_id_gpios.iter().map(|g| g.as_ref() as &dyn Gpio).collect();
            let hw_id_refs: [&dyn Gpio; 5] = hw_id_refs.try_into().unwrap_or_else(|_| panic!("exactly 5 HW_ID strap lines"));
            let hw_id = c3_linux::identity::read_hw_id(&hw_id_refs);
            log::info!("hardware version {hw_version}, hardware id {hw_id:#04x}");
            let _ = od.write_internal(IDX_HW_VERSION, ObjectValue::VisibleString(hw_version));
            let _ = od.write_internal(IDX_HW_ID, ObjectValue::U8(hw_id));
        }
        Err(e) => log::warn!("failed to read hardware version: {e}"),
    }

    persistent::restore_state(&mut od, rt.storage.as_mut()).unwrap_or_else(|e| {
        log::error!("failed to restore persistent state: {e}");
    });

    let euid_is_root = c3_linux::identity::euid_is_root();
    let boot_monotonic_s = clock::now_unix_s();

    let od = Arc::new(Mutex::new(od));
    let storage = Arc::new(Mutex::new(rt.storage));
    let rtc = Arc::new(Mutex::new(rt.rtc));
    let shutdown = shutdown::ShutdownHandle::new();
    let beacon_send_requested = Arc::new(AtomicBool::new(false));

    {
        let flag = beacon_send_requested.clone();
        od.lock()
            .unwrap()
            .add_write_callback(IDX_BEACON_SEND_NOW, move |v| {
                if *v == ObjectValue::Bool(true) {
                    flag.store(true, Ordering::Relaxed);
                }
            })
            .expect("BEACON_SEND_NOW is always registered");
    }

    let state_service = StateService::new(
        od.clone(),
        storage.clone(),
        boot_monotonic_s,
        rt.monopole,
        rt.helical,
        shutdown.clone(),
        flight_mode,
        euid_is_root,
    );

    let beacon_out = services::radios::beacon_out().unwrap_or_else(|e| {
        log::error!("failed to open beacon-out socket: {e}");
        std::process::exit(1);
    });
    let edl_in = services::radios::edl_in().unwrap_or_else(|e| {
        log::error!("failed to open EDL-in socket: {e}");
        std::process::exit(1);
    });
    let edl_out = services::radios::edl_out().unwrap_or_else(|e| {
        log::error!("failed to open EDL-out socket: {e}");
        std::process::exit(1);
    });

    let beacon_body = BeaconBody::new(beacon_fields());
    let beacon_service = BeaconService::new(od.clone(), beacon_body, Box::new(beacon_out), beacon_send_requested.clone());

    let opd = Opd::new(rt.expander, rt.sys_enable, rt.sys_fault, rt.opd_current_adc);
    let mut mgr = NodeManager::new(opd, fleet::BATTERY_NODE_NAMES.to_vec(), flight_mode);
    for node in fleet::build(version) {
        mgr.add_node(node);
    }
    let mgr = Arc::new(Mutex::new(mgr));

    let node_manager_service = NodeManagerService::new(od.clone(), mgr.clone(), rt.vbatt1_adc, rt.vbatt2_adc);

    let edl_service = EdlService::new(
        od.clone(),
        mgr.clone(),
        rtc.clone(),
        Box::new(edl_in),
        Box::new(edl_out),
        flight_mode,
        mock_hw,
        beacon_send_requested,
    );

    let mut runners = vec![
        runner::ServiceRunner::start(Box::new(state_service)),
        runner::ServiceRunner::start(Box::new(beacon_service)),
        runner::ServiceRunner::start(Box::new(node_manager_service)),
        runner::ServiceRunner::start(Box::new(edl_service)),
    ];

    let wd = watchdog::Watchdog::connect(services::radios::watchdog_local(), services::radios::watchdog_peer()).unwrap_or_else(|e| {
        log::error!("failed to open watchdog socket: {e}");
        std::process::exit(1);
    });

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        let shutdown = shutdown.clone();
        std::thread::spawn(move || {
            while !shutdown.is_requested() {
                std::thread::sleep(Duration::from_millis(100));
            }
            stop.store(true, Ordering::Relaxed);
        });
    }

    wd.run(&runners, flight_mode, &stop);

    for runner in &mut runners {
        runner.stop();
    }

    let kind = shutdown.kind();
    log::info!("stopping: reset kind {kind:?}");

    if kind == ResetKind::FactoryReset {
        let mut od = od.lock().unwrap();
        let mut storage = storage.lock().unwrap();
        let mut rtc = rtc.lock().unwrap();
        if let Err(e) = persistent::clear_state(&mut od, storage.as_mut(), rtc.as_mut()) {
            log::error!("factory reset store clear failed: {e}");
        }
    }

    std::process::exit(match kind {
        ResetKind::FactoryReset | ResetKind::HardReset => 1,
        ResetKind::SoftReset | ResetKind::NoStop => 0,
    });
}
