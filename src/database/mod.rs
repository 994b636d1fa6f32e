mod fetcher;
mod row;

pub use fetcher::{Query, RowSource, SqliteFetcher};
pub use row::{ResultSet, Row};

#[cfg(test)]
pub use row::Value;
