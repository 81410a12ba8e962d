//! Archiver core: IO-free watch-list model and user-input parsing.
mod input;
mod watch;

pub use input::{parse_tag_input, parse_thread_input, InputError, ThreadRef};
pub use watch::{WatchEntry, WatchError, WatchKind, WatchList, MAX_NAME_CHARS, MAX_WATCH_ENTRIES};
