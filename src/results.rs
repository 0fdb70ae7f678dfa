//! Rows returned by catalog queries, independent of the driver that produced them.

mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::CustomDbRow;
