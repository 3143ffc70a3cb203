//! Action primitives: selector-retry wait, click, human-paced typing,
//! navigation and best-effort screenshot capture.
//!
//! Every primitive takes the per-run [`RunCtx`](crate::RunCtx). Not-found is a
//! value (`None`/`false`), never an error; `Err` means the page transport failed.

mod capture;
mod click;
mod navigate;
mod type_text;
mod wait;

pub use capture::capture;
pub use click::{click, click_first};
pub use navigate::{current_url, goto, settle};
pub use type_text::{press_key, type_human};
pub use wait::{find_now, wait_absent, wait_for_any, wait_for_hidden, wait_for_url_change, Located};
