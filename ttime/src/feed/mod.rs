//! Feed access: typed row schemas and the tables they come from.
//!
//! A feed is a fixed set of CSV tables, either loose in a directory or
//! packed in a zip archive. Both are read through [`FeedSource`] with the
//! same header-indexed contract, each table being opened, consumed and
//! released before the next one is touched.

mod error;
mod rows;
mod source;

pub use error::{FeedError, FeedErrorKind};
pub use rows::{
    AgencyRow, CalendarDateRow, CalendarRow, ExceptionType, RouteRow, StopRow, StopTimeRow,
    TripRow,
};
pub use source::{FeedSource, Table};
