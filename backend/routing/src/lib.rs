pub mod address;

pub use address::{ConversationKind, RoutingAddress};
