// Export modules for use in tests
pub mod block;
pub mod debouncer;
pub mod event_source;
pub mod export;
pub mod frame_coords;
pub mod geometry;
pub mod message;
pub mod notification;
pub mod panel;
pub mod panic_handler;
pub mod renderer;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod theme;
pub mod transport;
pub mod viewer;
pub mod viewport;

pub mod test_utils;

pub use block::{BlockChange, BlockDescriptor, DocumentUri};
pub use frame_coords::{FrameCoordinates, MAX_SCALE, MIN_SCALE};
pub use session::Session;
pub use viewport::ViewportController;
