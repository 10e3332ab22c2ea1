//! Desktop notifications.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Whether the platform lets us raise notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided or not supported here.
    Default,
}

/// System-level alert collaborator.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Only called when `permission()` is `Granted`.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Notifications through the desktop's notification service.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    permission: Permission,
}

impl DesktopNotifier {
    /// Grant permission when a desktop session looks reachable.
    pub fn detect() -> Self {
        Self {
            permission: detect_permission(),
        }
    }

    pub fn with_permission(permission: Permission) -> Self {
        Self { permission }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn detect_permission() -> Permission {
    if std::env::var_os("DBUS_SESSION_BUS_ADDRESS").is_some() {
        Permission::Granted
    } else {
        Permission::Default
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn detect_permission() -> Permission {
    Permission::Granted
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("boxtimer")
            .icon("alarm-clock")
            .timeout(notify_rust::Timeout::Never)
            .show()
            .map(|_| ())
            .map_err(|e| CoreError::Custom(format!("notification failed: {e}")))
    }
}
