pub mod bucket;
pub mod common;
pub mod completions;
pub mod status;
pub mod sync;
pub mod watch;
