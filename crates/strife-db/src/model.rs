//! Model contract.

use crate::builder::QueryBuilder;
use crate::connection::ConnectionManager;

/// An entity stored in one table.
///
/// Implementors only name their table; every query and write operation
/// comes from the [`QueryBuilder`] returned by [`objects`](Model::objects).
///
/// # Example
///
/// ```ignore
/// struct User;
///
/// impl Model for User {
///     const TABLE: &'static str = "users";
/// }
///
/// let bob = User::objects(&mut db).where_eq("username", "bob").first().await?;
/// ```
pub trait Model {
    /// Table name.
    const TABLE: &'static str;

    /// Primary key column.
    const PRIMARY_KEY: &'static str = "id";

    /// Starts a query session on the model's table.
    fn objects(db: &mut ConnectionManager) -> QueryBuilder<'_> {
        QueryBuilder::new(db, Self::TABLE).primary_key(Self::PRIMARY_KEY)
    }
}
