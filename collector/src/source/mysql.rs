use super::{
    AggregateQuery,
    QueryFuture,
    QuerySource,
    Row,
    SourceError,
};
use sapawarga_exporter_config::DatabaseConfig;
use sea_orm::{
    sqlx,
    ConnectOptions,
    ConnectionTrait,
    Database,
    DatabaseConnection,
    DbErr,
    QueryResult,
    RuntimeErr,
    Statement,
};

/// [`QuerySource`] backed by sea-orm's pooled MySQL connection.
#[derive(Debug)]
pub struct MySqlSource {
    connection: DatabaseConnection,
}

impl MySqlSource {
    /// Opens the connection pool described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, SourceError> {
        let url = config.url().map_err(|err| SourceError::Connection(err.into()))?;
        let mut opt = ConnectOptions::new(url.to_string());
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(config.connect_timeout)
            .sqlx_logging(false);

        let connection = Database::connect(opt).await.map_err(classify)?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            max_connections = config.max_connections,
            "Database pool connected"
        );

        Ok(Self::from_connection(connection))
    }

    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

impl QuerySource for MySqlSource {
    fn run<'a>(&'a self, query: &'a AggregateQuery) -> QueryFuture<'a> {
        Box::pin(async move {
            let statement = Statement::from_string(self.connection.get_database_backend(), query.sql);
            let results = self.connection.query_all(statement).await.map_err(classify)?;
            trace!(rows = results.len(), "Aggregate query returned");

            results
                .iter()
                .enumerate()
                .map(|(index, result)| decode_row(index, result, query.dimensions))
                .collect()
        })
    }
}

fn classify(err: DbErr) -> SourceError {
    let lost = match &err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Query(RuntimeErr::SqlxError(inner)) | DbErr::Exec(RuntimeErr::SqlxError(inner)) => is_disconnect(inner),
        _ => false,
    };
    if lost {
        SourceError::Connection(err.into())
    } else {
        SourceError::Query(err.into())
    }
}

// A socket dropped mid-query surfaces as a query error, not as `DbErr::Conn`.
fn is_disconnect(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed
    )
}

fn decode_row(index: usize, result: &QueryResult, dimensions: usize) -> Result<Row, SourceError> {
    let shape = |column: usize, err: DbErr| SourceError::Shape {
        row: index,
        column,
        reason: err.to_string(),
    };

    let mut values = Vec::with_capacity(dimensions);
    for column in 0..dimensions {
        let value: Option<String> = result.try_get_by_index(column).map_err(|err| shape(column, err))?;
        values.push(value.unwrap_or_default());
    }

    let count: i64 = result.try_get_by_index(dimensions).map_err(|err| shape(dimensions, err))?;
    if count < 0 {
        return Err(SourceError::Shape {
            row: index,
            column: dimensions,
            reason: format!("negative count {count}"),
        });
    }

    Ok(Row {
        dimensions: values,
        count,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use sea_orm::{
        DatabaseBackend,
        MockDatabase,
        Value,
    };
    use std::collections::BTreeMap;

    // Mock rows are ordered by key, hence the positional column names.
    fn row(values: Vec<Value>) -> BTreeMap<String, Value> {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| (format!("c{index}"), value))
            .collect()
    }

    #[tokio::test]
    async fn decodes_area_all_rows() {
        let connection = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![
                row(vec![
                    Value::from("KOTA BANDUNG"),
                    Value::from("CIBEUNYING KALER"),
                    Value::from("SUKALUYU"),
                    Value::from("-6.9"),
                    Value::from("107.6"),
                    Value::BigInt(Some(4)),
                ]),
                row(vec![
                    Value::from("KAB. BOGOR"),
                    Value::from("CIBINONG"),
                    Value::from("PAKANSARI"),
                    Value::from(""),
                    Value::from(""),
                    Value::BigInt(Some(1)),
                ]),
            ]])
            .into_connection();
        let source = MySqlSource::from_connection(connection);

        let rows = source
            .run(&AggregateQuery::grouped("SELECT 1", 5))
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![
                Row::new(["KOTA BANDUNG", "CIBEUNYING KALER", "SUKALUYU", "-6.9", "107.6"], 4),
                Row::new(["KAB. BOGOR", "CIBINONG", "PAKANSARI", "", ""], 1),
            ]
        );
    }

    #[tokio::test]
    async fn decodes_scalar_count() {
        let connection = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![row(vec![Value::BigInt(Some(145))])]])
            .into_connection();
        let source = MySqlSource::from_connection(connection);

        let rows = source.run(&AggregateQuery::scalar("SELECT 1")).await.unwrap();

        assert_eq!(rows, vec![Row::new(Vec::<String>::new(), 145)]);
    }

    #[tokio::test]
    async fn missing_count_column_is_a_shape_error() {
        let connection = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![row(vec![Value::from("KOTA BANDUNG")])]])
            .into_connection();
        let source = MySqlSource::from_connection(connection);

        let err = source
            .run(&AggregateQuery::grouped("SELECT 1", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Shape { row: 0, column: 1, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn textual_count_is_a_shape_error() {
        let connection = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![row(vec![Value::from("KOTA BANDUNG"), Value::from("many")])]])
            .into_connection();
        let source = MySqlSource::from_connection(connection);

        let err = source
            .run(&AggregateQuery::grouped("SELECT 1", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Shape { column: 1, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn null_dimensions_decode_as_empty_strings() {
        let connection = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![row(vec![Value::String(None), Value::BigInt(Some(3))])]])
            .into_connection();
        let source = MySqlSource::from_connection(connection);

        let rows = source
            .run(&AggregateQuery::grouped("SELECT 1", 1))
            .await
            .unwrap();

        assert_eq!(rows, vec![Row::new([""], 3)]);
    }

    #[tokio::test]
    async fn dropped_sockets_are_connection_errors() {
        let lost = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset by peer");
        let connection = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_errors([
                DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Io(lost).into())),
                DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::PoolTimedOut.into())),
                DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::RowNotFound.into())),
            ])
            .into_connection();
        let source = MySqlSource::from_connection(connection);
        let query = AggregateQuery::grouped("SELECT 1", 1);

        let reset = source.run(&query).await.unwrap_err();
        let timed_out = source.run(&query).await.unwrap_err();
        let other = source.run(&query).await.unwrap_err();

        assert!(matches!(reset, SourceError::Connection(_)), "{reset:?}");
        assert!(matches!(timed_out, SourceError::Connection(_)), "{timed_out:?}");
        assert!(matches!(other, SourceError::Query(_)), "{other:?}");
    }

    #[tokio::test]
    async fn query_errors_are_reported() {
        let connection = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_errors([DbErr::Custom("table user doesn't exist".to_string())])
            .into_connection();
        let source = MySqlSource::from_connection(connection);

        let err = source
            .run(&AggregateQuery::grouped("SELECT 1", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Query(_)), "{err:?}");
    }
}
