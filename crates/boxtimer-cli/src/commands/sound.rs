use boxtimer_core::alarm::{Alarm, Note, SoundChoice, SystemAlarm};
use boxtimer_core::{Config, ConfigError};
use clap::Subcommand;
use serde::Serialize;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum SoundAction {
    /// List available alarm sounds
    List,
    /// Play an alarm sound
    Play {
        /// bell, chime or harp (default: from config)
        choice: Option<SoundChoice>,
        /// Volume between 0.0 and 1.0 (default: from config)
        #[arg(long)]
        volume: Option<f64>,
    },
}

#[derive(Serialize)]
struct SoundInfo {
    name: &'static str,
    description: &'static str,
    duration_secs: f64,
    is_default: bool,
    melody: &'static [Note],
}

pub fn run(action: SoundAction) -> CliResult {
    let config = Config::load()?;

    match action {
        SoundAction::List => {
            let sounds: Vec<SoundInfo> = SoundChoice::ALL
                .into_iter()
                .map(|choice| SoundInfo {
                    name: choice.name(),
                    description: choice.description(),
                    duration_secs: choice.total_duration().as_secs_f64(),
                    is_default: choice == config.sound.choice,
                    melody: choice.melody(),
                })
                .collect();
            print_json(&sounds)?;
        }
        SoundAction::Play { choice, volume } => {
            let choice = choice.unwrap_or(config.sound.choice);
            let volume = volume.unwrap_or(config.sound.volume);
            if !(0.0..=1.0).contains(&volume) {
                return Err(ConfigError::InvalidValue {
                    key: "volume".into(),
                    message: "must be between 0.0 and 1.0".into(),
                }
                .into());
            }
            let alarm = SystemAlarm::new();
            alarm.play(choice, volume)?;
            alarm.wait();
            println!("{{\"type\": \"sound_played\", \"choice\": \"{choice}\"}}");
        }
    }
    Ok(())
}
