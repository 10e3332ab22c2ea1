use boxtimer_core::notify::{DesktopNotifier, Notifier, Permission};
use boxtimer_core::Config;
use clap::Subcommand;
use serde_json::json;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum NotifyAction {
    /// Show notification permission and settings
    Status,
    /// Send a test notification
    Test,
}

pub fn run(action: NotifyAction) -> CliResult {
    let notifier = DesktopNotifier::detect();

    match action {
        NotifyAction::Status => {
            let config = Config::load()?;
            print_json(&json!({
                "permission": notifier.permission(),
                "enabled": config.notifications.enabled,
            }))?;
        }
        NotifyAction::Test => {
            let permission = notifier.permission();
            if permission != Permission::Granted {
                return Err(format!(
                    "notifications unavailable (permission: {})",
                    serde_json::to_string(&permission)?.trim_matches('"')
                )
                .into());
            }
            notifier.notify("BoxTimer", "Notifications are working.")?;
            println!("ok");
        }
    }
    Ok(())
}
