use serde_json::{Map, Value};
use shared::error::{Result, SluiceError};
use shared::protocol::{JsonLiteral, OperationKind};
use sluice_core::backend::{Execution, Subscriber};
use sluice_core::format::ResultFormat;
use sluice_core::operation::{
  compile_delete, compile_insert, compile_select, compile_update, CompiledStatement,
  DeleteRequest, InsertRequest, SelectRequest, UpdateRequest,
};
use std::sync::Arc;

use super::extract;
use super::HandlerContext;

type Fields = Map<String, Value>;

/// Run one operation to completion.
pub(crate) async fn handle(
  ctx: &HandlerContext,
  kind: OperationKind,
  fields: &Fields,
) -> Result<Option<JsonLiteral>> {
  match kind {
    OperationKind::Select => select(ctx, fields).await,
    OperationKind::Insert => insert(ctx, fields).await,
    OperationKind::Update => update(ctx, fields).await,
    OperationKind::Delete => delete(ctx, fields).await,
    OperationKind::Listen => listen(ctx, fields).await,
    OperationKind::Unlisten => unlisten(ctx, fields).await,
    OperationKind::UnlistenAll => unlisten_all(ctx).await,
    OperationKind::ApplyJwt => apply_jwt(ctx, fields),
    OperationKind::GetCanonicalRepr => canonical_representations(ctx, fields).await,
  }
}

// ── Statements ─────────────────────────────────────────────────────

async fn select(ctx: &HandlerContext, fields: &Fields) -> Result<Option<JsonLiteral>> {
  let mut req = SelectRequest::new(extract::select_target(fields)?);
  req.rules = extract::query_rules(fields);
  req.returning = extract::returning(fields)?;
  let format = extract::result_format(fields)?;
  req.order = extract::order(fields)?;
  req.limit = extract::limit(fields)?;
  req.slice = extract::slice(fields)?;
  let note = extract::chronicle_note(fields)?;
  req.require_updatable = extract::require_updatable(fields)?;

  let statement = compile_select(&req, &ctx.session.endpoint().schemas)?;
  run(ctx, statement, format, note).await
}

async fn insert(ctx: &HandlerContext, fields: &Fields) -> Result<Option<JsonLiteral>> {
  let req = InsertRequest {
    target: extract::relation(fields)?,
    rows: extract::rows(fields)?,
    returning: extract::returning(fields)?,
  };
  let format = extract::result_format(fields)?;
  let note = extract::chronicle_note(fields)?;

  let statement = compile_insert(&req, &ctx.session.endpoint().schemas)?;
  run(ctx, statement, format, note).await
}

async fn update(ctx: &HandlerContext, fields: &Fields) -> Result<Option<JsonLiteral>> {
  let req = UpdateRequest {
    target: extract::relation(fields)?,
    updates: extract::updates(fields)?,
    rules: extract::query_rules(fields),
    returning: extract::returning(fields)?,
  };
  let format = extract::result_format(fields)?;
  let note = extract::chronicle_note(fields)?;

  let statement = compile_update(&req, &ctx.session.endpoint().schemas)?;
  run(ctx, statement, format, note).await
}

async fn delete(ctx: &HandlerContext, fields: &Fields) -> Result<Option<JsonLiteral>> {
  let req = DeleteRequest {
    target: extract::relation(fields)?,
    rules: extract::query_rules(fields),
    returning: extract::returning(fields)?,
  };
  let format = extract::result_format(fields)?;
  let note = extract::chronicle_note(fields)?;

  let statement = compile_delete(&req, &ctx.session.endpoint().schemas)?;
  run(ctx, statement, format, note).await
}

async fn run(
  ctx: &HandlerContext,
  statement: CompiledStatement,
  format: ResultFormat,
  note: Option<String>,
) -> Result<Option<JsonLiteral>> {
  let execution = Execution {
    statement,
    format,
    session: ctx.session.snapshot(),
    note,
  };
  ctx.services.executor.execute(execution).await
}

// ── Notifications ──────────────────────────────────────────────────

async fn listen(ctx: &HandlerContext, fields: &Fields) -> Result<Option<JsonLiteral>> {
  let channel = extract::channel(fields)?;
  let subscriber: Arc<dyn Subscriber> = ctx.session.clone();
  ctx.services.relay.listen(subscriber, &channel).await?;
  Ok(None)
}

async fn unlisten(ctx: &HandlerContext, fields: &Fields) -> Result<Option<JsonLiteral>> {
  let channel = extract::channel(fields)?;
  ctx
    .services
    .relay
    .unlisten(ctx.session.id(), &channel)
    .await?;
  Ok(None)
}

async fn unlisten_all(ctx: &HandlerContext) -> Result<Option<JsonLiteral>> {
  ctx.services.relay.unlisten_all(ctx.session.id()).await?;
  Ok(None)
}

// ── Identity ───────────────────────────────────────────────────────

fn apply_jwt(ctx: &HandlerContext, fields: &Fields) -> Result<Option<JsonLiteral>> {
  let issuer = extract::issuer(fields)?;
  let token = extract::token(fields)?;
  let expires_in = ctx
    .session
    .apply_claims(&ctx.services.issuers, &issuer, token.as_deref())?;
  let encoded = JsonLiteral::encode(&expires_in)
    .map_err(|e| SluiceError::Internal(anyhow::Error::new(e)))?;
  Ok(Some(encoded))
}

async fn canonical_representations(
  ctx: &HandlerContext,
  fields: &Fields,
) -> Result<Option<JsonLiteral>> {
  let types = extract::types(fields)?;
  let value = extract::value(fields)?;
  let result = ctx
    .services
    .executor
    .canonical_representations(&types, &value)
    .await?;
  Ok(Some(result))
}
