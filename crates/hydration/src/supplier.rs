//! Row Suppliers - Where hydration rows come from
//!
//! The engine pulls rows one at a time; statement execution stays with the
//! caller. Suppliers are consumed once per pass.

use async_trait::async_trait;

use crate::error::HydrationResult;
use crate::row::Row;

/// A finite, lazily produced sequence of rows
#[async_trait]
pub trait RowSupplier: Send {
    /// Next row, or `None` once the result set is exhausted
    async fn next_row(&mut self) -> HydrationResult<Option<Row>>;

    /// Number of rows left, when known
    fn remaining(&self) -> Option<usize> {
        None
    }
}

/// Supplier over rows already held in memory
///
/// ```rust
/// use elif_hydration::{Row, RowSupplier, VecRowSupplier};
///
/// # tokio_test::block_on(async {
/// let mut supplier = VecRowSupplier::new(vec![Row::new().with_column("id", 7)]);
/// let row = supplier.next_row().await.unwrap().unwrap();
/// assert_eq!(row.get_as::<i64>("id").unwrap(), 7);
/// assert!(supplier.next_row().await.unwrap().is_none());
/// # });
/// ```
#[derive(Debug)]
pub struct VecRowSupplier {
    rows: std::vec::IntoIter<Row>,
}

impl VecRowSupplier {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl From<Vec<Row>> for VecRowSupplier {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

#[async_trait]
impl RowSupplier for VecRowSupplier {
    async fn next_row(&mut self) -> HydrationResult<Option<Row>> {
        Ok(self.rows.next())
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.rows.len())
    }
}

/// Supplier over fetched PostgreSQL rows, converted as they are pulled
pub struct PgRowSupplier {
    rows: std::vec::IntoIter<sqlx::postgres::PgRow>,
}

impl PgRowSupplier {
    pub fn new(rows: Vec<sqlx::postgres::PgRow>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

#[async_trait]
impl RowSupplier for PgRowSupplier {
    async fn next_row(&mut self) -> HydrationResult<Option<Row>> {
        Ok(self.rows.next().map(|row| Row::from_pg_row(&row)))
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.rows.len())
    }
}
