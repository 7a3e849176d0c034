//! Report store with a hierarchical tag tree.
//!
//! Reports are titled text documents. Tags form a forest; searching by a tag
//! also finds reports filed under any of its descendants.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod tui;
pub mod utils;

pub use db::Database;
pub use error::{Entity, ReportDbError, Result};
pub use models::{
    PATH_SEPARATOR, Report, ReportBuilder, ReportId, Tag, TagId, TagNode, TagTree,
};
pub use service::{ListReportsOptions, ReportChanges, ReportService, SortOrder};
