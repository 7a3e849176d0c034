mod ids;
mod report;
mod tag;
mod tag_tree;

pub use ids::{ReportId, TagId};
pub use report::{Report, ReportBuilder};
pub use tag::Tag;
pub use tag_tree::{PATH_SEPARATOR, TagNode, TagTree};
