// --------------- Platform table ---------------
pub mod platform;
pub use platform::{find_variant, HandleShape, PlatformVariant, PLATFORM_VARIANTS};

// --------------- Connected adapters ---------------
pub mod registry;
pub use registry::PlatformRegistry;

pub mod loopback;
pub use loopback::{LoopbackAdapter, LoopbackClient, SentMessage};

// --------------- Event synthesis ---------------
pub mod synthesizer;
pub use synthesizer::{EnvelopeSynthesizer, DEFAULT_SELF_ID};
