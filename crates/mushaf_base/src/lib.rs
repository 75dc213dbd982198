/* 📖 # Why have mushaf_base as a core library?
mushaf_base provides the foundational error handling, tracing setup and the
platform abstraction layer used across all crates. Keeping them here prevents
circular dependencies between the engine and the CLI.
*/

pub mod error;
pub mod pal;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, MushafError, MushafResult, ResultExt};
pub use pal::{FilePath, MockPal, Pal, PalHandle, RealPal};
