//! Thread list view model
//!
//! Everything here is a pure function of its inputs. Callers pass the
//! current time, the selected thread and the selected agent explicitly:
//! - `status`: raw status → priority, color token and label
//! - `bucket`: timestamp → Today / Yesterday / This Week / Older, and the
//!   grouping pass that puts interrupted threads under "Requiring Attention"
//! - `draft`: the synthetic entry for a conversation that hasn't been sent yet
//! - `summary`: search records → list rows
//! - `display`: time labels, truncation and message text extraction

mod bucket;
mod display;
mod draft;
mod model;
mod status;
mod summary;

pub use bucket::*;
pub use display::*;
pub use draft::*;
pub use model::*;
pub use status::*;
pub use summary::*;
