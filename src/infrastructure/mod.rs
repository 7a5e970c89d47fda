pub(crate) mod parser;
pub(crate) mod sources;
mod storage;

pub use parser::{ParsedFeed, ResultItemParser};
#[cfg(feature = "browser")]
pub use sources::chrome::ChromeSource;
pub use sources::{http::HttpSource, PageSource};
pub use storage::fs_store::FileSystemStore;
