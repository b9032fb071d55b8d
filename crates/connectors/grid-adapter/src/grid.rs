//! The command dispatcher: answers get-records, save-records and
//! delete-records for the configured grids.

use std::collections::HashMap;
use std::error::Error as _;
use std::sync::Arc;

use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::{info_span, Instrument};

use grid_adapter_configuration::Configuration;
use grid_models::{Command, ExplainResponse, GridRequest, GridResponse, RECID};
use query_engine_execution as execution;
use query_engine_translation::translation;
use query_engine_translation::translation::helpers::Env;
use query_engine_translation::translation::record::Record;

use crate::error::{display_id, GridError};
use crate::state::State;

/// Turns a fetched record into the row a grid displays.
pub type Projection = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// Serves grid commands against one configuration and database.
#[derive(Clone)]
pub struct GridAdapter {
    configuration: Arc<Configuration>,
    state: Arc<State>,
    projections: HashMap<String, Projection>,
}

impl GridAdapter {
    pub fn new(configuration: Arc<Configuration>, state: Arc<State>) -> Self {
        GridAdapter {
            configuration,
            state,
            projections: HashMap::new(),
        }
    }

    /// Register the projection of a grid. Grids without one are projected
    /// with [`Record::flatten`].
    #[must_use]
    pub fn with_projection<F>(mut self, grid: impl Into<String>, projection: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.projections.insert(grid.into(), Arc::new(projection));
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Parse a request body and dispatch it.
    pub async fn handle(&self, grid: &str, body: &[u8]) -> GridResponse {
        match parse_request(body) {
            Ok(request) => self.dispatch(grid, &request).await,
            Err(err) => self.respond(grid, Err(err)),
        }
    }

    /// Route a request to the handler of its command.
    pub async fn dispatch(&self, grid: &str, request: &GridRequest) -> GridResponse {
        match &request.cmd {
            Command::GetRecords => self.get_records(grid, request).await,
            Command::SaveRecords => self.save_records(grid, request).await,
            Command::DeleteRecords => self.delete_records(grid, request).await,
            Command::Other(cmd) => self.respond(grid, Err(GridError::UnknownCommand(cmd.clone()))),
        }
    }

    /// Answer a read: the restricted total and one projected page.
    pub async fn get_records(&self, grid: &str, request: &GridRequest) -> GridResponse {
        let result = self
            .read(grid, request)
            .instrument(info_span!("Get records", grid))
            .await;
        self.respond(grid, result)
    }

    /// Apply the changes of a save request, one record at a time.
    pub async fn save_records(&self, grid: &str, request: &GridRequest) -> GridResponse {
        let result = self
            .save(grid, request)
            .instrument(info_span!("Save records", grid))
            .await;
        self.respond(grid, result)
    }

    /// Delete the selected records. Identifiers of missing records are skipped.
    pub async fn delete_records(&self, grid: &str, request: &GridRequest) -> GridResponse {
        let result = self
            .delete(grid, request)
            .instrument(info_span!("Delete records", grid))
            .await;
        self.respond(grid, result)
    }

    /// The SQL a read request would run, pretty-printed, without running it.
    pub fn explain(&self, grid: &str, request: &GridRequest) -> Result<ExplainResponse, GridError> {
        let result = expect_command(request, &Command::GetRecords).and_then(|()| {
            let plan = info_span!("Plan query", grid).in_scope(|| {
                translation::query::translate(&self.configuration.metadata, grid, request)
                    .map_err(|err| GridError::translation(grid, err))
            })?;
            Ok(execution::query::explain(&plan))
        });

        match result {
            Ok(explained) => {
                self.state.metrics.explain_total.inc();
                Ok(ExplainResponse {
                    count_sql: explained.count_sql,
                    rows_sql: explained.rows_sql,
                    params: explained
                        .params
                        .iter()
                        .map(|param| serde_json::to_value(param).unwrap_or(Value::Null))
                        .collect(),
                })
            }
            Err(err) => {
                self.log_error(grid, &err);
                Err(err)
            }
        }
    }

    async fn read(&self, grid: &str, request: &GridRequest) -> Result<GridResponse, GridError> {
        expect_command(request, &Command::GetRecords)?;
        let env = self.env(grid)?;

        let plan = info_span!("Plan query", grid).in_scope(|| {
            translation::query::translate(&self.configuration.metadata, grid, request)
                .map_err(|err| GridError::translation(grid, err))
        })?;

        let mut connection = self
            .state
            .pool
            .acquire()
            .await
            .map_err(|err| GridError::Fetch(err.into()))?;
        let total = execution::query::count(&mut connection, &plan)
            .await
            .map_err(GridError::Fetch)?;
        let rows = execution::query::fetch_rows(&mut connection, &plan)
            .await
            .map_err(GridError::Fetch)?;

        let projection = self.projection(grid);
        let records = rows
            .into_iter()
            .map(|row| Record::from_row(&env, row).map(|record| projection(&record)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| GridError::translation(grid, err))?;

        self.state.metrics.get_records_total.inc();
        Ok(GridResponse::records(total, records))
    }

    async fn save(&self, grid: &str, request: &GridRequest) -> Result<GridResponse, GridError> {
        expect_command(request, &Command::SaveRecords)?;
        let env = self.env(grid)?;

        for changes in request.changes.iter() {
            let recid = changes.get(RECID).cloned().unwrap_or(Value::Null);
            let id = display_id(&recid);
            let failed = |err: execution::error::Error| GridError::Save(id.clone(), err);

            // the lookup, the changes and their statements commit together
            let mut transaction = self
                .state
                .pool
                .begin()
                .await
                .map_err(|err| failed(err.into()))?;

            let Some(mut record) = find_record(&env, &mut transaction, &recid)
                .await
                .map_err(|err| err.into_grid_error(grid, &failed))?
            else {
                tracing::trace!(grid, recid = %id, "skipping change of a missing record");
                continue;
            };

            translation::mutation::apply_changes(&env, &mut record, changes).map_err(
                |err| match err {
                    translation::error::Error::InvalidField(field, source) => {
                        GridError::InvalidValue {
                            field,
                            recid: id.clone(),
                            source: *source,
                        }
                    }
                    err => GridError::translation(grid, err),
                },
            )?;

            let plan = translation::mutation::translate_save(&env, &record)
                .map_err(|err| GridError::translation(grid, err))?;
            if plan.query.is_empty() {
                tracing::trace!(grid, recid = %id, "nothing to save");
                continue;
            }

            execution::mutation::execute(&mut transaction, &plan)
                .await
                .map_err(failed)?;
            transaction.commit().await.map_err(|err| failed(err.into()))?;
            self.state.metrics.records_saved_total.inc();
        }

        self.state.metrics.save_records_total.inc();
        Ok(GridResponse::success())
    }

    async fn delete(&self, grid: &str, request: &GridRequest) -> Result<GridResponse, GridError> {
        expect_command(request, &Command::DeleteRecords)?;
        let env = self.env(grid)?;

        for recid in request.selected.iter() {
            let id = display_id(recid);
            let failed = |err: execution::error::Error| GridError::Delete(id.clone(), err);

            let mut transaction = self
                .state
                .pool
                .begin()
                .await
                .map_err(|err| failed(err.into()))?;

            let Some(record) = find_record(&env, &mut transaction, recid)
                .await
                .map_err(|err| err.into_grid_error(grid, &failed))?
            else {
                tracing::trace!(grid, recid = %id, "skipping deletion of a missing record");
                continue;
            };

            let plan = translation::mutation::translate_delete(&env, &record)
                .map_err(|err| GridError::translation(grid, err))?;
            execution::mutation::execute(&mut transaction, &plan)
                .await
                .map_err(failed)?;
            transaction.commit().await.map_err(|err| failed(err.into()))?;
            self.state.metrics.records_deleted_total.inc();
        }

        self.state.metrics.delete_records_total.inc();
        Ok(GridResponse::success())
    }

    fn env<'a>(&'a self, grid: &'a str) -> Result<Env<'a>, GridError> {
        Env::new(&self.configuration.metadata, grid).map_err(|err| GridError::translation(grid, err))
    }

    fn projection(&self, grid: &str) -> Projection {
        self.projections
            .get(grid)
            .cloned()
            .unwrap_or_else(|| Arc::new(Record::flatten) as Projection)
    }

    fn respond(&self, grid: &str, result: Result<GridResponse, GridError>) -> GridResponse {
        match result {
            Ok(response) => response,
            Err(err) => {
                self.log_error(grid, &err);
                GridResponse::error(err.to_string())
            }
        }
    }

    fn log_error(&self, grid: &str, err: &GridError) {
        self.state.metrics.error_total.inc();
        tracing::error!(
            meta.signal_type = "log",
            event.domain = "grid",
            event.name = "Grid error",
            grid,
            body = %err,
            cause = ?err.source().map(ToString::to_string),
            error = true,
        );
    }
}

/// Parse a request body. Grids post JSON; anything else is rejected.
pub fn parse_request(body: &[u8]) -> Result<GridRequest, GridError> {
    serde_json::from_slice(body).map_err(|err| GridError::InvalidRequest(err.to_string()))
}

fn expect_command(request: &GridRequest, expected: &Command) -> Result<(), GridError> {
    if &request.cmd == expected {
        Ok(())
    } else {
        Err(GridError::CommandMismatch {
            expected: expected.clone(),
            received: request.cmd.clone(),
        })
    }
}

/// Why a record could not be looked up.
enum FindError {
    Translation(translation::error::Error),
    Execution(execution::error::Error),
}

impl FindError {
    fn into_grid_error(
        self,
        grid: &str,
        failed: impl Fn(execution::error::Error) -> GridError,
    ) -> GridError {
        match self {
            FindError::Translation(err) => GridError::translation(grid, err),
            FindError::Execution(err) => failed(err),
        }
    }
}

/// Look a record of the grid up by its identifier.
async fn find_record(
    env: &Env<'_>,
    connection: &mut SqliteConnection,
    recid: &Value,
) -> Result<Option<Record>, FindError> {
    let Some(plan) = translation::query::translate_lookup(env, recid).map_err(FindError::Translation)?
    else {
        return Ok(None);
    };
    let Some(row) = execution::query::lookup(connection, &plan)
        .await
        .map_err(FindError::Execution)?
    else {
        return Ok(None);
    };
    Record::from_row(env, row)
        .map(Some)
        .map_err(FindError::Translation)
}
