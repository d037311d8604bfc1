//! Vector map viewer core: the renderer-facing [`MapView`] plus the pieces the
//! `vecmap` driver needs around it.

mod error;
mod frame_clock;
mod map_view;
pub mod platform;

pub use error::AppError;
pub use frame_clock::FrameClock;
pub use map_view::MapView;
pub use platform::{PlatformDirs, PlatformError};
