pub mod args;
pub mod detection;
pub mod dispatch;
pub mod handlers;
pub mod pipeline;
pub mod registry;
pub mod types;

use std::sync::Arc;

pub use args::{build_command_string, parse_command_args, validate_mapping};
pub use detection::{detect_command, strip_wake_prefix};
pub use dispatch::{reply, CommandDispatcher, CommandHandler};
pub use handlers::{HelpHandler, WhoAmIHandler};
pub use pipeline::{panic_message, CommandPipeline};
pub use registry::{builtin_commands, CommandRegistry};
pub use types::{CommandArg, CommandCategory, CommandDef, CommandInvocation};

/// Register the built-in handlers on a finished registry and build the
/// pipeline around it.
pub fn build_pipeline(
    registry: CommandRegistry,
    mut dispatcher: CommandDispatcher,
    wake_prefixes: Vec<String>,
) -> CommandPipeline {
    let registry = Arc::new(registry);
    let shown_prefix = wake_prefixes.first().cloned().unwrap_or_default();

    dispatcher.register(
        "help",
        Arc::new(HelpHandler {
            registry: registry.clone(),
            wake_prefix: shown_prefix,
        }),
    );
    dispatcher.register("whoami", Arc::new(WhoAmIHandler));

    CommandPipeline::new(registry, Arc::new(dispatcher), wake_prefixes)
}
