pub mod adapter;
pub mod composer;
pub mod cursor;
pub mod debounce;
pub mod logic;

pub use adapter::{Connectivity, RetryPolicy};
pub use composer::{FeedCommand, FeedComposer, FeedConfig, FeedHandle, FeedView};
pub use cursor::{FeedCursor, LocalPageSource, PageSource};
