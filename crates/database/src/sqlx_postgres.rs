use sqlx::{postgres::PgArguments, Error as SqlxError, Executor, FromRow, Postgres};

/// Trait to define the schema of a database object for PostgreSQL.
pub trait SqlxSchema: Send + Sync + Unpin + Clone + std::fmt::Debug {
    /// The type of the primary key for this database object.
    type Id: Send + Sync + Clone + for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres>;

    /// The intermediate type that implements FromRow, used for fetching from
    /// the database. Entities whose fields all map directly onto column types
    /// use `Self` here; entities with text-mapped enums carry a Row struct.
    type Row: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin;

    const TABLE_NAME: &'static str;
    const ID_COLUMN_NAME: &'static str;
    const COLUMNS: &'static [&'static str];
    const INDEXES_SQL: &'static [&'static str];

    fn id_column_name() -> &'static str { Self::ID_COLUMN_NAME }
    fn table_name() -> &'static str { Self::TABLE_NAME }
    fn columns() -> &'static [&'static str] { Self::COLUMNS }
    fn indexes_sql() -> &'static [&'static str] { Self::INDEXES_SQL }

    /// Retrieves the value of the primary key for an instance of the object.
    fn get_id_value(&self) -> Self::Id;

    /// Converts the intermediate Row type to the Self type.
    fn from_row(row: Self::Row) -> Self;

    /// Generates the SQL query string for creating the table.
    fn create_table_sql() -> String;

    fn select_columns_sql() -> String {
        Self::COLUMNS
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn select_all_sql() -> String {
        format!("SELECT {} FROM \"{}\"", Self::select_columns_sql(), Self::TABLE_NAME)
    }

    fn select_by_id_sql() -> String {
        format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = $1",
            Self::select_columns_sql(),
            Self::TABLE_NAME,
            Self::ID_COLUMN_NAME
        )
    }

    fn insert_sql() -> String {
        let placeholders = (1..=Self::COLUMNS.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING {}",
            Self::TABLE_NAME,
            Self::select_columns_sql(),
            placeholders,
            Self::select_columns_sql()
        )
    }

    fn update_by_id_sql() -> String {
        let assignments = Self::COLUMNS
            .iter()
            .filter(|c| **c != Self::ID_COLUMN_NAME)
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ${}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ${} RETURNING {}",
            Self::TABLE_NAME,
            assignments,
            Self::ID_COLUMN_NAME,
            Self::COLUMNS.len(),
            Self::select_columns_sql()
        )
    }

    fn delete_by_id_sql() -> String {
        format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = $1",
            Self::TABLE_NAME,
            Self::ID_COLUMN_NAME
        )
    }

    fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS \"{}\" CASCADE", Self::TABLE_NAME)
    }

    fn trigger_sql() -> String {
        if !Self::COLUMNS.contains(&"updated_at") {
            return String::new();
        }
        let trigger_name = format!("set_updated_at_{}", Self::TABLE_NAME);
        format!(
            "DROP TRIGGER IF EXISTS {trigger} ON \"{table}\"; CREATE TRIGGER {trigger} BEFORE UPDATE ON \"{table}\" FOR EACH ROW EXECUTE PROCEDURE set_updated_at_unix_timestamp();",
            trigger = trigger_name,
            table = Self::TABLE_NAME
        )
    }
}

/// Trait for CRUD (Create, Read, Update, Delete) operations for PostgreSQL.
#[async_trait::async_trait]
pub trait SqlxCrud: SqlxSchema + Sized {
    /// Binds the struct fields to an insert query, in `COLUMNS` order.
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Binds the struct fields to an update query: every non-id column in
    /// `COLUMNS` order, then the id for the WHERE clause.
    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Creates a new record in the database.
    async fn create<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::insert_sql();
        self.bind_insert(sqlx::query_as::<_, Self::Row>(&sql))
            .fetch_one(executor)
            .await
            .map(Self::from_row)
    }

    /// Finds a record by its primary key.
    async fn find_by_id<'e, E>(id: Self::Id, executor: E) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::select_by_id_sql();
        sqlx::query_as::<_, Self::Row>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map(|opt_row| opt_row.map(Self::from_row))
    }

    /// Updates an existing record in the database by its primary key.
    async fn update<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::update_by_id_sql();
        self.bind_update(sqlx::query_as::<_, Self::Row>(&sql))
            .fetch_one(executor)
            .await
            .map(Self::from_row)
    }

    /// Deletes a record from the database by its primary key.
    async fn delete<'e, E>(self, executor: E) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::delete_by_id_sql();
        sqlx::query(&sql)
            .bind(self.get_id_value())
            .execute(executor)
            .await
            .map(|done| done.rows_affected())
    }
}

/// Specifies the direction for ordering query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// A trait to allow for boxing of different types that can be encoded as sqlx
/// arguments, so `QueryCriteria` can hold values of mixed types.
pub trait AsSqlxArg: Send + Sync {
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError>;
}

impl<T> AsSqlxArg for T
where
    T: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
{
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError> {
        use sqlx::Arguments;
        args.add(self.clone()).map_err(SqlxError::Encode)
    }
}

/// A single predicate of a filtered query.
///
/// Operators may carry a `$?` marker which is replaced by the actual
/// placeholder index at render time (for shapes like `= ANY($?)`); operators
/// without the marker get ` $n` appended when a value is present.
pub enum FilterExpr {
    /// `"column" <op> $n`
    Column {
        column: &'static str,
        operator: &'static str,
        value: Option<Box<dyn AsSqlxArg>>,
    },
    /// `("a" <op> $n OR "b" <op> $n)`, with one bound value shared by every column.
    AnyColumn {
        columns: &'static [&'static str],
        operator: &'static str,
        value: Box<dyn AsSqlxArg>,
    },
    /// `"column" <op> (<subquery>)` with `$?` inside the subquery resolved to
    /// the placeholder of the single bound value.
    Subquery {
        column: &'static str,
        operator: &'static str,
        subquery: &'static str,
        value: Box<dyn AsSqlxArg>,
    },
}

/// Represents the complete criteria for a filtered database query: a
/// conjunction of optional predicates plus ordering and pagination.
#[derive(Default)]
pub struct QueryCriteria {
    pub conditions: Vec<FilterExpr>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order_by: Vec<(&'static str, OrderDirection)>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter condition that may or may not have a value.
    pub fn add_filter<V>(
        mut self,
        column: &'static str,
        operator: &'static str,
        value: Option<V>,
    ) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterExpr::Column {
            column,
            operator,
            value: value.map(|v| Box::new(v) as Box<dyn AsSqlxArg>),
        });
        self
    }

    /// A convenience method for `add_filter` that requires a value.
    pub fn add_valued_filter<V>(self, column: &'static str, operator: &'static str, value: V) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.add_filter(column, operator, Some(value))
    }

    /// Adds a condition matching when ANY of the given columns matches the
    /// value (used for free-text search across several text columns).
    pub fn add_any_column_filter<V>(
        mut self,
        columns: &'static [&'static str],
        operator: &'static str,
        value: V,
    ) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterExpr::AnyColumn {
            columns,
            operator,
            value: Box::new(value),
        });
        self
    }

    /// Adds a membership condition against a subquery. The subquery must
    /// reference its single bound value through the `$?` marker.
    pub fn add_subquery_filter<V>(
        mut self,
        column: &'static str,
        operator: &'static str,
        subquery: &'static str,
        value: V,
    ) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterExpr::Subquery {
            column,
            operator,
            subquery,
            value: Box::new(value),
        });
        self
    }

    /// Sets the LIMIT for the query.
    pub fn limit(mut self, limit_val: i64) -> Self {
        self.limit = Some(limit_val);
        self
    }

    /// Sets the OFFSET for the query.
    pub fn offset(mut self, offset_val: i64) -> Self {
        self.offset = Some(offset_val);
        self
    }

    /// Adds an ORDER BY clause.
    pub fn order_by(mut self, column: &'static str, direction: OrderDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }
}

fn render_where_clauses(
    criteria: &QueryCriteria,
    args: &mut PgArguments,
    placeholder_idx: &mut usize,
) -> Result<Vec<String>, SqlxError> {
    let mut where_clauses = Vec::new();

    for condition in &criteria.conditions {
        match condition {
            FilterExpr::Column {
                column,
                operator,
                value,
            } => {
                let mut clause = format!("\"{column}\" {operator}");
                if let Some(value) = value {
                    value.add_to_args(args)?;
                    if operator.contains("$?") {
                        clause = format!(
                            "\"{}\" {}",
                            column,
                            operator.replace("$?", &format!("${placeholder_idx}"))
                        );
                    } else {
                        clause.push_str(&format!(" ${placeholder_idx}"));
                    }
                    *placeholder_idx += 1;
                }
                where_clauses.push(clause);
            }
            FilterExpr::AnyColumn {
                columns,
                operator,
                value,
            } => {
                value.add_to_args(args)?;
                let alternatives = columns
                    .iter()
                    .map(|c| format!("\"{c}\" {operator} ${placeholder_idx}"))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                *placeholder_idx += 1;
                where_clauses.push(format!("({alternatives})"));
            }
            FilterExpr::Subquery {
                column,
                operator,
                subquery,
                value,
            } => {
                value.add_to_args(args)?;
                let subquery = subquery.replace("$?", &format!("${placeholder_idx}"));
                *placeholder_idx += 1;
                where_clauses.push(format!("\"{column}\" {operator} ({subquery})"));
            }
        }
    }

    Ok(where_clauses)
}

/// Renders a full SELECT statement plus its argument buffer for the given
/// criteria against the schema `S`.
pub fn render_select_sql<S: SqlxSchema>(
    criteria: &QueryCriteria,
) -> Result<(String, PgArguments), SqlxError> {
    let mut sql_query_parts: Vec<String> = Vec::new();
    let mut arguments = PgArguments::default();
    let mut placeholder_idx = 1;

    sql_query_parts.push(format!(
        "SELECT {} FROM \"{}\"",
        S::select_columns_sql(),
        S::TABLE_NAME
    ));

    let where_clauses = render_where_clauses(criteria, &mut arguments, &mut placeholder_idx)?;
    if !where_clauses.is_empty() {
        sql_query_parts.push(format!("WHERE {}", where_clauses.join(" AND ")));
    }

    if !criteria.order_by.is_empty() {
        let order_clauses: Vec<String> = criteria
            .order_by
            .iter()
            .map(|&(col, dir)| format!("\"{}\" {}", col, dir.as_sql()))
            .collect();
        sql_query_parts.push(format!("ORDER BY {}", order_clauses.join(", ")));
    }

    if let Some(limit_val) = criteria.limit {
        use sqlx::Arguments;
        arguments.add(limit_val).map_err(SqlxError::Encode)?;
        sql_query_parts.push(format!("LIMIT ${placeholder_idx}"));
        placeholder_idx += 1;
    }

    if let Some(offset_val) = criteria.offset {
        use sqlx::Arguments;
        arguments.add(offset_val).map_err(SqlxError::Encode)?;
        sql_query_parts.push(format!("OFFSET ${placeholder_idx}"));
    }

    Ok((sql_query_parts.join(" "), arguments))
}

/// Renders a COUNT(*) statement for the criteria's conditions. Ordering and
/// pagination are ignored: the count covers every matching row.
pub fn render_count_sql<S: SqlxSchema>(
    criteria: &QueryCriteria,
) -> Result<(String, PgArguments), SqlxError> {
    let mut arguments = PgArguments::default();
    let mut placeholder_idx = 1;

    let mut sql = format!("SELECT COUNT(*) FROM \"{}\"", S::TABLE_NAME);
    let where_clauses = render_where_clauses(criteria, &mut arguments, &mut placeholder_idx)?;
    if !where_clauses.is_empty() {
        sql.push_str(&format!(" WHERE {}", where_clauses.join(" AND ")));
    }

    Ok((sql, arguments))
}

/// Renders a DELETE statement for the criteria's conditions.
pub fn render_delete_sql<S: SqlxSchema>(
    criteria: &QueryCriteria,
) -> Result<(String, PgArguments), SqlxError> {
    let mut arguments = PgArguments::default();
    let mut placeholder_idx = 1;

    let mut sql = format!("DELETE FROM \"{}\"", S::TABLE_NAME);
    let where_clauses = render_where_clauses(criteria, &mut arguments, &mut placeholder_idx)?;
    if !where_clauses.is_empty() {
        sql.push_str(&format!(" WHERE {}", where_clauses.join(" AND ")));
    }

    Ok((sql, arguments))
}

/// Trait for finding records based on dynamic filter criteria.
#[async_trait::async_trait]
pub trait SqlxFilterQuery: SqlxSchema + Sized {
    /// Finds records based on the provided criteria.
    async fn find_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<Vec<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let (sql, arguments) = render_select_sql::<Self>(&criteria)?;
        sqlx::query_as_with::<_, Self::Row, _>(&sql, arguments)
            .fetch_all(executor)
            .await
            .map(|rows| rows.into_iter().map(Self::from_row).collect())
    }

    /// Finds a single optional record based on the provided criteria.
    async fn find_one_by_criteria<'e, E>(
        mut criteria: QueryCriteria,
        executor: E,
    ) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        if criteria.limit.is_none() {
            criteria = criteria.limit(1);
        }
        let mut results = Self::find_by_criteria(criteria, executor).await?;
        Ok(results.pop())
    }

    /// Counts records matching the criteria's conditions.
    async fn count_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<i64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let (sql, arguments) = render_count_sql::<Self>(&criteria)?;
        sqlx::query_scalar_with::<_, i64, _>(&sql, arguments)
            .fetch_one(executor)
            .await
    }

    /// Deletes records based on the provided criteria.
    async fn delete_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let (sql, arguments) = render_delete_sql::<Self>(&criteria)?;
        sqlx::query_with(&sql, arguments)
            .execute(executor)
            .await
            .map(|done| done.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Uuid;

    #[derive(Debug, Clone, sqlx::FromRow)]
    #[allow(dead_code)]
    struct Widget {
        id: Uuid,
        name: String,
        size: Option<i64>,
        created_at: i64,
        updated_at: i64,
    }

    impl SqlxSchema for Widget {
        type Id = Uuid;
        type Row = Self;

        const TABLE_NAME: &'static str = "widgets";
        const ID_COLUMN_NAME: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["id", "name", "size", "created_at", "updated_at"];
        const INDEXES_SQL: &'static [&'static str] = &[];

        fn get_id_value(&self) -> Uuid {
            self.id
        }

        fn from_row(row: Self::Row) -> Self {
            row
        }

        fn create_table_sql() -> String {
            String::new()
        }
    }

    #[test]
    fn insert_sql_lists_every_column_once() {
        assert_eq!(
            Widget::insert_sql(),
            "INSERT INTO \"widgets\" (\"id\", \"name\", \"size\", \"created_at\", \"updated_at\") \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING \"id\", \"name\", \"size\", \"created_at\", \"updated_at\""
        );
    }

    #[test]
    fn update_sql_sets_non_id_columns_and_filters_on_id() {
        let sql = Widget::update_by_id_sql();
        assert!(sql.starts_with("UPDATE \"widgets\" SET \"name\" = $1, \"size\" = $2, \"created_at\" = $3, \"updated_at\" = $4"));
        assert!(sql.contains("WHERE \"id\" = $5"));
        assert!(sql.ends_with("RETURNING \"id\", \"name\", \"size\", \"created_at\", \"updated_at\""));
    }

    #[test]
    fn trigger_sql_present_only_with_updated_at() {
        assert!(Widget::trigger_sql().contains("set_updated_at_widgets"));
    }

    #[test]
    fn renders_conjunction_of_filters() {
        let criteria = QueryCriteria::new()
            .add_valued_filter("name", "=", "gizmo".to_string())
            .add_valued_filter("size", ">=", 3i64);
        let (sql, _) = render_select_sql::<Widget>(&criteria).unwrap();
        assert!(sql.contains("WHERE \"name\" = $1 AND \"size\" >= $2"));
    }

    #[test]
    fn renders_any_column_filter_with_shared_placeholder() {
        let criteria = QueryCriteria::new()
            .add_valued_filter("size", ">", 1i64)
            .add_any_column_filter(&["name", "label"], "ILIKE", "%giz%".to_string());
        let (sql, _) = render_select_sql::<Widget>(&criteria).unwrap();
        assert!(sql.contains("(\"name\" ILIKE $2 OR \"label\" ILIKE $2)"));
    }

    #[test]
    fn renders_operator_placeholder_marker() {
        let criteria = QueryCriteria::new().add_valued_filter(
            "name",
            "= ANY($?)",
            vec!["a".to_string(), "b".to_string()],
        );
        let (sql, _) = render_select_sql::<Widget>(&criteria).unwrap();
        assert!(sql.contains("WHERE \"name\" = ANY($1)"));
    }

    #[test]
    fn renders_subquery_filter() {
        let criteria = QueryCriteria::new().add_subquery_filter(
            "id",
            "IN",
            "SELECT \"widget_id\" FROM \"widget_tags\" WHERE \"tag\" = ANY($?)",
            vec!["x".to_string()],
        );
        let (sql, _) = render_select_sql::<Widget>(&criteria).unwrap();
        assert!(sql.contains(
            "\"id\" IN (SELECT \"widget_id\" FROM \"widget_tags\" WHERE \"tag\" = ANY($1))"
        ));
    }

    #[test]
    fn renders_order_limit_offset_after_filters() {
        let criteria = QueryCriteria::new()
            .add_valued_filter("size", "=", 2i64)
            .order_by("created_at", OrderDirection::Desc)
            .order_by("name", OrderDirection::Asc)
            .limit(10)
            .offset(20);
        let (sql, _) = render_select_sql::<Widget>(&criteria).unwrap();
        assert!(sql.contains("ORDER BY \"created_at\" DESC, \"name\" ASC LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn count_ignores_pagination() {
        let criteria = QueryCriteria::new()
            .add_valued_filter("size", "=", 2i64)
            .limit(10)
            .offset(20);
        let (sql, _) = render_count_sql::<Widget>(&criteria).unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM \"widgets\" WHERE \"size\" = $1");
    }

    #[test]
    fn renders_delete_by_criteria() {
        let criteria = QueryCriteria::new().add_valued_filter("name", "=", "gizmo".to_string());
        let (sql, _) = render_delete_sql::<Widget>(&criteria).unwrap();
        assert_eq!(sql, "DELETE FROM \"widgets\" WHERE \"name\" = $1");
    }

    #[test]
    fn null_test_filter_binds_no_value() {
        let criteria = QueryCriteria::new().add_filter::<i64>("size", "IS NULL", None);
        let (sql, _) = render_select_sql::<Widget>(&criteria).unwrap();
        assert!(sql.ends_with("WHERE \"size\" IS NULL"));
    }
}
