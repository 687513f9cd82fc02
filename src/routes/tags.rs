use axum::{extract::State, Json};
use serde_json::Value;
use tracing::{debug, info};

use super::JsonBody;
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    store::{DocumentKind, DocumentQuery, SortOrder},
    types::{to_document, CreateTagRequest, NewTag, TAG_NAME},
    validation::{require_object, BodyValidator},
};

pub async fn get_all_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Value>>> {
    let query = DocumentQuery::all().sort(SortOrder::FieldAsc(TAG_NAME));
    let tags = state.store.find(DocumentKind::Tags, &query).await?;
    Ok(Json(tags))
}

async fn find_tag(state: &AppState, tag_name: &str) -> AppResult<Option<Value>> {
    let query = DocumentQuery::all().field_eq(TAG_NAME, tag_name).limit(1);
    let tags = state.store.find(DocumentKind::Tags, &query).await?;
    Ok(tags.into_iter().next())
}

/// Returns the stored tag when one with the same name already exists.
pub async fn create_tag(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> AppResult<Json<Value>> {
    let body = require_object(body)?;
    BodyValidator::new(&body)
        .required_text("tagName", 50)
        .finish("Creation error")
        .inspect_err(|_| state.metrics.inc_validation_failures())?;

    let req: CreateTagRequest = serde_json::from_value(Value::Object(body))?;
    let tag_name = req.tag_name.trim().to_string();

    if let Some(tag) = find_tag(&state, &tag_name).await? {
        return Ok(Json(tag));
    }

    let doc = to_document(&NewTag { tag_name: tag_name.clone() })?;
    match state.store.save(DocumentKind::Tags, doc).await {
        Ok(saved) => {
            state.metrics.inc_created();
            info!(%tag_name, "tag created");
            Ok(Json(saved))
        }
        // The unique index on tag names caught a concurrent create of the same name
        Err(AppError::Conflict(_)) => {
            debug!(%tag_name, "tag created concurrently, returning the stored one");
            let tag = find_tag(&state, &tag_name)
                .await?
                .ok_or_else(|| anyhow::anyhow!("tag {:?} conflicted but cannot be found", tag_name))?;
            Ok(Json(tag))
        }
        Err(e) => Err(e),
    }
}
