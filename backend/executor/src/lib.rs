pub mod admin;
pub mod executor;
pub mod processor;
pub mod runtime;
pub mod store;
pub mod tools;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use admin::{admin_commands, decode_command_name, register_admin, AdminContext, ADMIN_GROUP};
pub use executor::{cause_chain, CommandExecutor};
pub use processor::{CommandProcessor, DEFAULT_FORWARD_INTERVAL, DEFAULT_FORWARD_LABEL};
pub use runtime::{BridgeRuntime, BridgeRuntimeBuilder};
pub use store::{MappingError, MappingRecord, MappingStore};
pub use tools::{CommandTool, DynamicToolManager};
pub use trigger::{CaptureOutcome, CommandTrigger, DEFAULT_DISPATCH_TIMEOUT};
