//! Order book subscription module ("sniper mode")
//!
//! A bounded set of live order book streams per venue, opened on demand for
//! candidate instruments and kept alive across reconnects.

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{Activation, ConnectionState, Subscription, SubscriptionConfig};
