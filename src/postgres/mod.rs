// PostgreSQL transport
//
// - config: translate a `Configuration` into driver connection settings
// - connector: `Connector`/`Session` implementations over tokio-postgres
// - params: parameter conversion from `RowValues`
// - query: result extraction and building
// - quote: identifier and literal quoting for DDL

pub mod config;
pub mod connector;
pub mod params;
pub mod query;
pub mod quote;

pub use config::pg_config;
pub use connector::{PgConnector, PgSession};
pub use params::Params;
pub use query::build_result_set_from_rows;
pub use quote::{quote_ident, quote_literal};
