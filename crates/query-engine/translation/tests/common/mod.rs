use std::fs;
use std::path::PathBuf;

use grid_adapter_configuration::environment::FixedEnvironment;
use query_engine_metadata::metadata;
use query_engine_sql::sql;
use query_engine_translation::translation;

/// The metadata of the shared test configuration.
pub async fn static_metadata() -> anyhow::Result<metadata::Metadata> {
    let directory = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../../static");
    let parsed_configuration = grid_adapter_configuration::parse_configuration(&directory).await?;
    let configuration = grid_adapter_configuration::make_runtime_configuration(
        parsed_configuration,
        FixedEnvironment::from([(
            grid_adapter_configuration::DEFAULT_CONNECTION_URI_VARIABLE.into(),
            "the translation tests do not rely on a database connection".into(),
        )]),
    )?;
    Ok(configuration.metadata)
}

/// The rendered count and page queries of a read request.
pub struct Translated {
    pub count: sql::string::SQL,
    pub rows: sql::string::SQL,
}

/// Translate the golden request of a test against the `users` grid.
pub async fn test_translation(testname: &str) -> anyhow::Result<Translated> {
    let metadata = static_metadata().await?;
    let request = serde_json::from_str(&fs::read_to_string(
        PathBuf::from("tests/goldenfiles").join(format!("{testname}.json")),
    )?)?;

    let plan = translation::query::translate(&metadata, "users", &request)?;
    Ok(Translated {
        count: plan.query.count_sql(),
        rows: plan.query.rows_sql(),
    })
}

pub const RECORD_SELECT: &str = r#"SELECT json_object('users', json_object('age', "users"."age", 'birthday', "users"."birthday", 'created_at', "users"."created_at", 'email', "users"."email", 'id', "users"."id", 'name', "users"."name", 'profile_id', "users"."profile_id"), 'profile', json_object('bio', "profile"."bio", 'city', "profile"."city", 'id', "profile"."id")) AS "record""#;

pub const COUNT_SELECT: &str = r#"SELECT COUNT(*) AS "total""#;

pub const FROM_USERS: &str = r#" FROM "users" AS "users" LEFT OUTER JOIN "profiles" AS "profile" ON ("users"."profile_id" = "profile"."id")"#;
