//! The library catalog and its on-disk record format.
//!
//! # Storage Layout
//!
//! ```text
//! ./
//! ├── books.txt     # id,title,author,category,issued
//! └── members.txt   # id,name,email,101|102
//! ```

pub mod catalog;
pub mod codec;
pub mod query;

pub use catalog::{
    Catalog, CatalogError, CatalogOptions, Inconsistency, IssueOutcome, LoadReport, ReturnOutcome,
};
pub use query::BookField;
