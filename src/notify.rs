use async_trait::async_trait;
use tracing::info;

use crate::traits::{NotificationPermission, Notifier};
use crate::types::Result;

/// Notifier that surfaces announcements through the process log. Stands in
/// for a desktop/browser notification channel in headless deployments.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        info!("Notification: {} | {}", title, body);
        Ok(())
    }
}

/// Notifier for environments where the capability is absent or was denied.
pub struct NoopNotifier {
    permission: NotificationPermission,
}

impl NoopNotifier {
    pub fn denied() -> Self {
        Self {
            permission: NotificationPermission::Denied,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            permission: NotificationPermission::Unsupported,
        }
    }
}

#[async_trait]
impl Notifier for NoopNotifier {
    async fn permission(&self) -> NotificationPermission {
        self.permission
    }

    async fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}
