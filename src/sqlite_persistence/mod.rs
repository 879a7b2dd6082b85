mod versioned_schema;

pub use versioned_schema::{Column, DatabaseSchema, SqlType, Table, BASE_DB_VERSION};
