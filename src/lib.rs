//! Turn a Kindle "My Clippings" export into one Markdown note per book and
//! keep those notes in sync across runs.

pub mod book;
pub mod clipping;
pub mod cover;
pub mod dedup;
pub mod input;
pub mod locale;
pub mod metadata;
pub mod note;
pub mod parser;
pub mod pipeline;
pub mod reconcile;
pub mod title;

pub use book::{compute_book_id, BookGroup, BookId};
pub use clipping::Clipping;
pub use parser::{parse_clippings, LocaleMode, ParseError};
pub use pipeline::{prepare, PrepareOptions, RunReport};
pub use reconcile::{Action, Outcome, Reconciler};
