//! Alert module
//!
//! Alert values, notification channels and per-recipient fan-out

mod dispatcher;
mod notifier;
mod types;

pub use dispatcher::{AlertDispatcher, DispatchReport};
pub use notifier::{LogNotifier, Notifier, TelegramNotifier, TELEGRAM_API_URL};
pub use types::{Alert, AlertClass};

use crate::config::{NotifierConfig, NotifierKind};
use std::sync::Arc;

/// Build the configured notification channel
pub fn build_notifier(config: &NotifierConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match config.kind {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Telegram => {
            let token = config
                .bot_token
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("telegram notifier requires a bot token"))?;
            let notifier = TelegramNotifier::new(token, config.api_url.as_deref())?;
            Ok(Arc::new(notifier))
        }
    }
}
