/* 📖 # What is the Platform Abstraction Layer?

The PAL provides a trait-based abstraction over file access and the HTTP
server. Engine code depends on the Pal trait only; RealPal talks to the
filesystem and tiny_http, MockPal keeps everything in memory for tests.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{Pal, PalHandle, ReadSeek};
