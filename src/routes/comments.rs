use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use super::JsonBody;
use crate::{
    error::{AppError, AppResult, FieldError},
    state::AppState,
    store::{DocumentKind, DocumentQuery, SortOrder},
    types::{to_document, CreateCommentRequest, NewComment, ITEM_ID},
    validation::{parse_id, require_object, BodyValidator},
};

/// Comments of one item in the order they were written.
pub async fn get_comments_by_item_id(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<Vec<Value>>> {
    let item_id = parse_id(&item_id, "itemId")?;
    let query = DocumentQuery::all().field_eq(ITEM_ID, item_id).sort(SortOrder::OldestFirst);
    let comments = state.store.find(DocumentKind::Comments, &query).await?;
    Ok(Json(comments))
}

pub async fn create_comment(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> AppResult<Json<Value>> {
    let body = require_object(body)?;
    BodyValidator::new(&body)
        .required_id("itemId")
        .required_text("authorId", 100)
        .required_text("authorName", 100)
        .required_text("commentText", 1000)
        .finish("Creation error")
        .inspect_err(|_| state.metrics.inc_validation_failures())?;

    let mut req: CreateCommentRequest = serde_json::from_value(Value::Object(body))?;
    req.item_id = parse_id(&req.item_id, "itemId")?;
    if state.store.find_by_id(DocumentKind::Items, &req.item_id).await?.is_none() {
        state.metrics.inc_validation_failures();
        return Err(AppError::validation(
            "Creation error",
            vec![FieldError::new("itemId", "item does not exist")],
        ));
    }

    let comment = NewComment::from(req);
    let saved = state.store.save(DocumentKind::Comments, to_document(&comment)?).await?;
    state.metrics.inc_created();
    info!(item_id = %comment.item_id, "comment created");
    Ok(Json(saved))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> AppResult<Json<Option<Value>>> {
    let comment_id = parse_id(&comment_id, "commentId")?;
    let deleted = state.store.find_by_id_and_delete(DocumentKind::Comments, &comment_id).await?;
    if deleted.is_some() {
        state.metrics.add_deleted(1);
    }
    Ok(Json(deleted))
}
