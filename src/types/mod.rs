pub mod bar;
pub mod panel;
pub mod signals;

pub use bar::*;
pub use panel::*;
pub use signals::*;
