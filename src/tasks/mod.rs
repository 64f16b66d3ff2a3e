//! Background threads of the display server.
//!
//! - `render`: Render worker that owns the device and drains the mailbox

pub mod render;

pub use render::{RenderHandle, RenderWorker, WorkerOptions};
