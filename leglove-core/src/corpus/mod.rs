//! Corpus traversal.
//!
//! - **Loader**: Turns one document file into text
//! - **Progress**: Counters and observer hooks
//! - **Stream**: Lazy iterator of normalized token sequences

pub mod loader;
pub mod progress;
pub mod stream;

pub use loader::{DocumentLoader, JsonOpinionLoader, PlainTextLoader};
pub use progress::{CorpusProgress, LogProgress, NoProgress, ProgressObserver};
pub use stream::{stream, CorpusStream};
