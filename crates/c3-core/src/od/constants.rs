//! Central repository for Object Dictionary indices.
//!
//! Flat store, so every entry gets a single `u16` index and no sub-index
//! structure is needed; kept as a dedicated module (rather than inlined at
//! each call site) following the same `IDX_` naming convention the original
//! object dictionary used for its own well-known indices.

// --- Mission state machine (§4.3) ---
pub const IDX_STATUS: u16 = 0x3000;
pub const IDX_FLIGHT_MODE: u16 = 0x3001;
pub const IDX_TX_CONTROL_ENABLE: u16 = 0x3002;
pub const IDX_TX_LAST_ENABLE_TIMESTAMP: u16 = 0x3003;
pub const IDX_VBATT_BP1: u16 = 0x3004;
pub const IDX_VBATT_BP2: u16 = 0x3005;
pub const IDX_EDL_LAST_TIMESTAMP: u16 = 0x3006;
pub const IDX_DEPLOYED: u16 = 0x3007;
pub const IDX_LAST_RESET_TIMESTAMP: u16 = 0x3008;
pub const IDX_SYSTEM_RESET: u16 = 0x3009;
pub const IDX_TX_CONTROL_TIMEOUT: u16 = 0x300A;
pub const IDX_EDL_TIMEOUT: u16 = 0x300B;
pub const IDX_RESET_TIMEOUT: u16 = 0x300C;
pub const IDX_ANTENNAS_ATTEMPTS: u16 = 0x300E;
pub const IDX_ANTENNAS_MAX_ATTEMPTS: u16 = 0x300F;
pub const IDX_ANTENNAS_PRE_ATTEMPT_TIMEOUT: u16 = 0x3010;
pub const IDX_ANTENNAS_REATTEMPT_TIMEOUT: u16 = 0x3011;
pub const IDX_ANTENNAS_PULSE_WIDTH_MS: u16 = 0x3012;
pub const IDX_ANTENNAS_INTER_DEPLOY_DELAY_MS: u16 = 0x3013;

// --- EDL protocol (§4.1, §4.2, §4.7) ---
pub const IDX_EDL_SEQUENCE_NUMBER: u16 = 0x3100;
pub const IDX_EDL_ACTIVE_KEY_INDEX: u16 = 0x3101;
pub const IDX_EDL_CRYPTO_KEY_0: u16 = 0x3102;
pub const IDX_EDL_CRYPTO_KEY_1: u16 = 0x3103;
pub const IDX_EDL_CRYPTO_KEY_2: u16 = 0x3104;
pub const IDX_EDL_CRYPTO_KEY_3: u16 = 0x3105;
pub const IDX_EDL_REJECTED_COUNT: u16 = 0x3106;

// --- Beacon service (§4.4) ---
pub const IDX_BEACON_DELAY: u16 = 0x3200;
pub const IDX_BEACON_LAST_TIMESTAMP: u16 = 0x3201;
pub const IDX_BEACON_SEND_NOW: u16 = 0x3202;
pub const IDX_BEACON_SRC_CALLSIGN: u16 = 0x3203;
pub const IDX_BEACON_DEST_CALLSIGN: u16 = 0x3204;

// --- OPD / node manager (§4.5) ---
pub const IDX_OPD_SYSENABLE: u16 = 0x3300;
pub const IDX_OPD_UART_NODE_SELECT: u16 = 0x3301;
pub const IDX_NODE_MANAGER_TOTAL_NODES: u16 = 0x3302;
pub const IDX_NODE_MANAGER_NODES_OFF: u16 = 0x3303;
pub const IDX_NODE_MANAGER_NODES_BOOTING: u16 = 0x3304;
pub const IDX_NODE_MANAGER_NODES_ON: u16 = 0x3305;
pub const IDX_NODE_MANAGER_NODES_WITH_ERRORS: u16 = 0x3306;
pub const IDX_NODE_MANAGER_NODES_NOT_FOUND: u16 = 0x3307;
pub const IDX_NODE_MANAGER_NODES_DEAD: u16 = 0x3308;

// --- Identity / hardware readback (§11.2) ---
pub const IDX_HW_VERSION: u16 = 0x3400;
pub const IDX_HW_ID: u16 = 0x3401;
