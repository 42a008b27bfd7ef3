//! Engineering Data Link: the authenticated uplink/downlink command channel
//! (§4.1, §4.2).

pub mod codec;
pub mod command;
pub mod frame;
pub mod registry;

pub use codec::{pack, unpack, EdlKey, Unpacked};
pub use command::{CommandDescriptor, CommandRegistry, Field, Request, Response, Value};
pub use frame::OriginTag;
pub use registry::{active_key, advance_sequence, record_rejected, register_entries};
