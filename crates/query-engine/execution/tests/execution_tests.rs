use std::collections::BTreeMap;

use serde_json::json;
use similar_asserts::assert_eq;
use sqlx::{Connection, Executor, SqliteConnection};

use query_engine_execution::{mutation, query};
use query_engine_sql::sql::ast::*;
use query_engine_sql::sql::execution_plan::{ExecutionPlan, Lookup, Mutation, Statement};
use query_engine_sql::sql::helpers;

async fn seeded_connection() -> SqliteConnection {
    let mut connection = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    connection
        .execute(
            "CREATE TABLE colours (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             INSERT INTO colours VALUES (1, 'red'), (2, 'green'), (3, 'blue');",
        )
        .await
        .unwrap();
    connection
}

fn colours() -> (From, TableReference) {
    let alias = helpers::make_table_alias("colours".to_string());
    (
        From::Table {
            reference: TableReference::DBTable(TableName("colours".to_string())),
            alias: alias.clone(),
        },
        TableReference::AliasedTable(alias),
    )
}

fn column(name: &str) -> Expression {
    helpers::make_column(colours().1, ColumnName(name.to_string()))
}

fn record_select() -> Select {
    let (from, _) = colours();
    let mut select = helpers::simple_select(vec![(
        helpers::make_column_alias(helpers::RECORD_COLUMN.to_string()),
        Expression::JsonObject(vec![(
            "colours".to_string(),
            Expression::JsonObject(vec![
                ("id".to_string(), column("id")),
                ("name".to_string(), column("name")),
            ]),
        )]),
    )]);
    select.from = Some(from);
    select
}

fn read_plan(
    where_: Expression,
    limit: Option<u32>,
) -> ExecutionPlan<query_engine_sql::sql::execution_plan::Query> {
    let (from, _) = colours();
    let count = helpers::count_select(from, vec![], Where(where_.clone()));
    let mut rows = record_select();
    rows.where_ = Where(where_);
    rows.order_by = OrderBy {
        elements: vec![OrderByElement {
            target: column("id"),
            direction: OrderByDirection::Desc,
        }],
    };
    rows.limit = Limit { limit, offset: None };
    query_engine_sql::sql::execution_plan::simple_query_execution_plan(
        "colours".to_string(),
        count,
        rows,
    )
}

fn by_id(id: i64) -> Expression {
    helpers::equals(column("id"), Expression::Value(Value::Int8(id)))
}

#[tokio::test]
async fn counts_ignore_the_page() {
    let mut connection = seeded_connection().await;
    let plan = read_plan(helpers::true_expr(), Some(1));

    assert_eq!(query::count(&mut connection, &plan).await.unwrap(), 3);
    assert_eq!(
        query::fetch_rows(&mut connection, &plan).await.unwrap(),
        vec![json!({"colours": {"id": 3, "name": "blue"}})]
    );
}

#[tokio::test]
async fn parameters_are_bound_in_order() {
    let mut connection = seeded_connection().await;
    let plan = read_plan(
        Expression::Or {
            left: Box::new(by_id(1)),
            right: Box::new(Expression::Like {
                expression: Box::new(column("name")),
                pattern: Box::new(Expression::Value(Value::String("gr%".to_string()))),
            }),
        },
        None,
    );

    assert_eq!(query::count(&mut connection, &plan).await.unwrap(), 2);
    assert_eq!(
        query::fetch_rows(&mut connection, &plan).await.unwrap(),
        vec![
            json!({"colours": {"id": 2, "name": "green"}}),
            json!({"colours": {"id": 1, "name": "red"}}),
        ]
    );
}

#[tokio::test]
async fn lookups_find_at_most_one_record() {
    let mut connection = seeded_connection().await;
    let lookup = |id| {
        let mut select = record_select();
        select.where_ = Where(by_id(id));
        select.limit = Limit {
            limit: Some(1),
            offset: None,
        };
        ExecutionPlan {
            grid: "colours".to_string(),
            query: Lookup { select },
        }
    };

    assert_eq!(
        query::lookup(&mut connection, &lookup(2)).await.unwrap(),
        Some(json!({"colours": {"id": 2, "name": "green"}}))
    );
    assert_eq!(query::lookup(&mut connection, &lookup(9)).await.unwrap(), None);
}

#[tokio::test]
async fn mutations_run_every_statement() {
    let mut connection = seeded_connection().await;
    let plan = ExecutionPlan {
        grid: "colours".to_string(),
        query: Mutation {
            statements: vec![
                Statement::Update(Update {
                    table: TableName("colours".to_string()),
                    set: BTreeMap::from([(
                        ColumnName("name".to_string()),
                        Expression::Value(Value::String("teal".to_string())),
                    )]),
                    where_: Where(helpers::equals(
                        helpers::make_column(
                            TableReference::DBTable(TableName("colours".to_string())),
                            ColumnName("id".to_string()),
                        ),
                        Expression::Value(Value::Int8(2)),
                    )),
                }),
                Statement::Delete(Delete {
                    table: TableName("colours".to_string()),
                    where_: Where(helpers::equals(
                        helpers::make_column(
                            TableReference::DBTable(TableName("colours".to_string())),
                            ColumnName("id".to_string()),
                        ),
                        Expression::Value(Value::Int8(3)),
                    )),
                }),
            ],
        },
    };

    assert_eq!(mutation::execute(&mut connection, &plan).await.unwrap(), 2);

    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM colours ORDER BY id")
        .fetch_all(&mut connection)
        .await
        .unwrap();
    assert_eq!(names, vec!["red".to_string(), "teal".to_string()]);
}

#[test]
fn explained_plans_are_formatted() {
    let explained = query::explain(&read_plan(by_id(1), Some(10)));

    assert!(explained.count_sql.starts_with("SELECT"));
    assert!(explained.rows_sql.contains("LIMIT"));
    assert_eq!(
        explained.params,
        vec![query_engine_sql::sql::string::Param::Integer(1)]
    );
}
