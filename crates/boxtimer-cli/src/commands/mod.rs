pub mod config;
pub mod notify;
pub mod sound;
pub mod stats;
pub mod task;
pub mod timer;

mod app;

pub use app::App;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
