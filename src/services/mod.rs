pub mod dispatch;
pub mod runner;
pub mod signals;

pub use dispatch::{AlertDispatcher, LogDispatcher, TelegramDispatcher};
pub use runner::{RunnerSettings, SignalRunner};
pub use signals::SignalEngine;
