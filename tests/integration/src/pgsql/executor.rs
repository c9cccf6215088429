use serde_json::{json, Value};
use shared::error::SluiceError;
use sluice_core::backend::{Execution, Executor};
use sluice_core::format::ResultFormat;
use sluice_core::operation::{
  compile_insert, compile_select, AllowedSchemas, CompiledStatement, InsertRequest,
  RelationTarget, ReturningSpec, SelectRequest,
};
use sluice_core::paginate::{OrderItem, SliceDirection, SliceSpec, SortDirection};
use sluice_pgsql::{create_pool, PgExecutor};

use super::schema::{ensure_fixtures, load_test_config, APP_SCHEMA};

async fn executor() -> PgExecutor {
  let cfg = load_test_config();
  ensure_fixtures(&cfg).await;
  let pool = create_pool(&cfg).unwrap();
  PgExecutor::new(pool, cfg.private_schema.clone())
}

fn session() -> Value {
  json!({
    "remote-address": "192.0.2.44",
    "session-start-timestamp": "2026-01-01T00:00:00+00:00",
    "claims": {},
  })
}

fn execution(statement: CompiledStatement, format: ResultFormat) -> Execution {
  Execution {
    statement,
    format,
    session: session(),
    note: None,
  }
}

fn schemas() -> AllowedSchemas {
  AllowedSchemas::new([APP_SCHEMA])
}

fn ordered() -> Vec<OrderItem> {
  vec![
    OrderItem::new("rank", SortDirection::Ascending),
    OrderItem::new("id", SortDirection::Descending),
  ]
}

async fn ids(executor: &PgExecutor, slice: Option<SliceSpec>) -> Vec<i64> {
  let mut req = SelectRequest::new(RelationTarget::relation(APP_SCHEMA, "items"));
  req.order = ordered();
  req.slice = slice;
  let stmt = compile_select(&req, &schemas()).unwrap();
  let result = executor
    .execute(execution(stmt, ResultFormat::Json))
    .await
    .unwrap()
    .unwrap();
  let rows: Vec<Value> = serde_json::from_str(result.as_str()).unwrap();
  rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}

#[tokio::test]
#[ignore]
async fn slices_partition_the_ordered_set() {
  let executor = executor().await;
  let everything = ids(&executor, None).await;
  assert_eq!(everything.len(), 7);
  // NULL ranks sort first.
  assert_eq!(&everything[..2], &[5, 2]);

  let rows: Vec<Value> = serde_json::from_str(
    executor
      .execute(execution(
        compile_select(
          &SelectRequest::new(RelationTarget::relation(APP_SCHEMA, "items")),
          &schemas(),
        )
        .unwrap(),
        ResultFormat::Json,
      ))
      .await
      .unwrap()
      .unwrap()
      .as_str(),
  )
  .unwrap();

  for row in rows {
    let boundary = json!({ "rank": row["rank"], "id": row["id"] })
      .as_object()
      .cloned();
    let id = row["id"].as_i64().unwrap();

    let later = ids(
      &executor,
      Some(SliceSpec {
        relative_to: boundary.clone(),
        direction: SliceDirection::Later,
      }),
    )
    .await;
    let earlier = ids(
      &executor,
      Some(SliceSpec {
        relative_to: boundary,
        direction: SliceDirection::Earlier,
      }),
    )
    .await;

    let mut union = earlier.clone();
    union.push(id);
    union.extend(&later);
    assert_eq!(union, everything, "boundary {id}");
  }
}

#[tokio::test]
#[ignore]
async fn csv_results_are_one_json_string() {
  let executor = executor().await;
  let mut req = SelectRequest::new(RelationTarget::relation(APP_SCHEMA, "items"));
  req.returning = ReturningSpec::Columns(vec!["id".into(), "rank".into()]);
  req.order = vec![OrderItem::new("id", SortDirection::Ascending)];
  req.limit = Some(2);
  let stmt = compile_select(&req, &schemas()).unwrap();

  let result = executor
    .execute(execution(stmt, ResultFormat::Csv))
    .await
    .unwrap()
    .unwrap();
  let text: String = serde_json::from_str(result.as_str()).unwrap();
  assert_eq!(text, "id,rank\r\n1,3\r\n2,\r\n");
}

#[tokio::test]
#[ignore]
async fn restored_session_is_visible_to_the_statement() {
  let executor = executor().await;
  let req = SelectRequest::new(RelationTarget::function(APP_SCHEMA, "whoami", vec![]));
  let stmt = compile_select(&req, &schemas()).unwrap();
  let mut run = execution(stmt, ResultFormat::Json);
  run.note = Some("audit trail".into());

  let result = executor.execute(run).await.unwrap().unwrap();
  let rows: Value = serde_json::from_str(result.as_str()).unwrap();
  assert_eq!(rows, json!([{ "remote": "192.0.2.44", "note": "audit trail" }]));
}

#[tokio::test]
#[ignore]
async fn constraint_violations_carry_diagnostics() {
  let executor = executor().await;
  let req = InsertRequest {
    target: RelationTarget::relation(APP_SCHEMA, "items"),
    rows: vec![json!({ "id": 99, "name": "alpha" }).as_object().cloned().unwrap()],
    returning: ReturningSpec::Nothing,
  };
  let stmt = compile_insert(&req, &schemas()).unwrap();
  let err = executor
    .execute(execution(stmt, ResultFormat::Json))
    .await
    .unwrap_err();

  let SluiceError::Backend { message, diagnostics } = &err else {
    panic!("expected a backend error, got {err:?}");
  };
  assert!(message.starts_with("duplicate key value violates unique constraint"));
  assert_eq!(diagnostics["sqlstate"], "23505");
  assert_eq!(diagnostics["sqlstate-name"], "unique_violation");
  assert_eq!(diagnostics["table-name"], "items");
}

#[tokio::test]
#[ignore]
async fn canonical_representations_are_returned_verbatim() {
  let executor = executor().await;
  let result = executor
    .canonical_representations(&["int4".into(), "text".into()], "07")
    .await
    .unwrap();
  let value: Value = serde_json::from_str(result.as_str()).unwrap();
  assert_eq!(value, json!(["07", "07"]));
}
