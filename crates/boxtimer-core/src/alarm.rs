//! Alarm sounds.
//!
//! Three short melodies. Playback runs on a background thread: a system
//! sound player when one is installed, terminal bells otherwise.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

/// One tone of a melody.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Note {
    pub frequency_hz: f64,
    pub duration_secs: f64,
}

const fn note(frequency_hz: f64, duration_secs: f64) -> Note {
    Note {
        frequency_hz,
        duration_secs,
    }
}

// C5 G5 C6
const BELL: [Note; 3] = [note(523.25, 0.4), note(783.99, 0.4), note(1046.50, 0.6)];
// C5 E5 G5 C6
const CHIME: [Note; 4] = [
    note(523.25, 0.3),
    note(659.25, 0.3),
    note(783.99, 0.3),
    note(1046.50, 0.4),
];
// C5 D5 E5 G5 A5
const HARP: [Note; 5] = [
    note(523.25, 0.25),
    note(587.33, 0.25),
    note(659.25, 0.25),
    note(783.99, 0.25),
    note(880.00, 0.35),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundChoice {
    /// Gentle bell
    Bell,
    /// Pleasant chime
    #[default]
    Chime,
    /// Soft harp
    Harp,
}

impl SoundChoice {
    pub const ALL: [SoundChoice; 3] = [SoundChoice::Bell, SoundChoice::Chime, SoundChoice::Harp];

    pub fn name(self) -> &'static str {
        match self {
            SoundChoice::Bell => "bell",
            SoundChoice::Chime => "chime",
            SoundChoice::Harp => "harp",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SoundChoice::Bell => "A gentle bell",
            SoundChoice::Chime => "A pleasant chime",
            SoundChoice::Harp => "A soft harp",
        }
    }

    pub fn melody(self) -> &'static [Note] {
        match self {
            SoundChoice::Bell => &BELL,
            SoundChoice::Chime => &CHIME,
            SoundChoice::Harp => &HARP,
        }
    }

    pub fn total_duration(self) -> Duration {
        Duration::from_secs_f64(self.melody().iter().map(|n| n.duration_secs).sum())
    }

    /// Freedesktop sound theme file used by [`SystemAlarm`].
    fn theme_file(self) -> &'static str {
        match self {
            SoundChoice::Bell => "/usr/share/sounds/freedesktop/stereo/bell.oga",
            SoundChoice::Chime => "/usr/share/sounds/freedesktop/stereo/complete.oga",
            SoundChoice::Harp => "/usr/share/sounds/freedesktop/stereo/message.oga",
        }
    }
}

impl std::fmt::Display for SoundChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SoundChoice {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        SoundChoice::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CoreError::Custom(format!("unknown sound: {s} (expected bell, chime or harp)"))
            })
    }
}

/// Audible feedback collaborator.
pub trait Alarm: Send + Sync {
    /// Start playing `choice` at `volume` (0.0 ..= 1.0). Returns once
    /// playback is scheduled, not when it ends.
    fn play(&self, choice: SoundChoice, volume: f64) -> Result<()>;
}

/// Plays through `paplay` when available, terminal bells otherwise.
///
/// Clones share the list of playbacks in flight, so a short-lived process
/// can [`wait`](SystemAlarm::wait) for them before exiting.
#[derive(Debug, Clone, Default)]
pub struct SystemAlarm {
    playing: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SystemAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every playback started so far has finished.
    pub fn wait(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut playing = self.playing.lock().unwrap_or_else(|p| p.into_inner());
            playing.drain(..).collect()
        };
        for handle in handles {
            if handle.join().is_err() {
                warn!("alarm playback thread panicked");
            }
        }
    }
}

/// paplay takes a linear volume where 65536 is 100%.
fn paplay_volume(volume: f64) -> u32 {
    (volume.clamp(0.0, 1.0) * 65536.0).round() as u32
}

fn play_blocking(choice: SoundChoice, volume: f64) {
    let file = choice.theme_file();
    if Path::new(file).exists() {
        let status = Command::new("paplay")
            .arg(format!("--volume={}", paplay_volume(volume)))
            .arg(file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => return,
            Ok(s) => debug!("paplay exited with {s}, falling back to terminal bell"),
            Err(e) => debug!("paplay unavailable ({e}), falling back to terminal bell"),
        }
    }
    if volume <= 0.0 {
        return;
    }
    let mut stderr = std::io::stderr();
    for n in choice.melody() {
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
        std::thread::sleep(Duration::from_secs_f64(n.duration_secs));
    }
}

impl Alarm for SystemAlarm {
    fn play(&self, choice: SoundChoice, volume: f64) -> Result<()> {
        let handle = std::thread::Builder::new()
            .name("boxtimer-alarm".into())
            .spawn(move || play_blocking(choice, volume))?;
        self.playing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(handle);
        Ok(())
    }
}
