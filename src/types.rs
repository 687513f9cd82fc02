use anyhow::Context;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppResult;

// Field names shared by handlers, hooks and store queries.
pub const COLLECTION_ID: &str = "collectionId";
pub const COLLECTION_NAME: &str = "collectionName";
pub const COLLECTION_THEME: &str = "collectionTheme";
pub const ITEM_ID: &str = "itemId";
pub const ITEMS_QUANTITY: &str = "itemsQuantity";
pub const OWNER_ID: &str = "ownerId";
pub const TAG_NAME: &str = "tagName";

const AVATAR_BASE: &str = "https://source.boringavatars.com/marble/120";
const AVATAR_PARAMS: &str = "colors=F97D58,CDDCEB,F9DBCF,33B99,5D70C5&square";

/// Characters left unescaped inside one avatar path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Generated avatar used when an item or collection has no image.
pub fn default_avatar(name: &str, owner_id: &str) -> String {
    format!(
        "{}/{}%20{}?{}",
        AVATAR_BASE,
        utf8_percent_encode(name, SEGMENT),
        utf8_percent_encode(owner_id, SEGMENT),
        AVATAR_PARAMS
    )
}

/// Serializes a typed document into the map the store persists.
pub fn to_document<T: Serialize>(value: &T) -> AppResult<Map<String, Value>> {
    match serde_json::to_value(value).context("failed to encode document")? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow::anyhow!("document serialized to a non-object: {}", other).into()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn str_field<'v>(doc: &'v Value, field: &str) -> Option<&'v str> {
    doc.get(field).and_then(Value::as_str)
}

// ---- Items ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub collection_id: String,
    pub collection_name: Option<String>,
    pub collection_theme: Option<String>,
    pub owner_id: String,
    pub owner_name: String,
    pub item_name: String,
    pub item_image: Option<String>,
    pub custom_fields: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub collection_id: String,
    pub collection_name: String,
    pub collection_theme: String,
    pub owner_id: String,
    pub owner_name: String,
    pub item_name: String,
    pub item_image: String,
    pub likes: Vec<String>,
    pub custom_fields: Vec<Value>,
}

impl NewItem {
    /// Builds the item document; missing collection copies come from `collection`.
    pub fn from_request(req: CreateItemRequest, collection: &Value) -> Self {
        let item_name = req.item_name.trim().to_string();
        let owner_id = req.owner_id.trim().to_string();
        let item_image = non_blank(req.item_image).unwrap_or_else(|| default_avatar(&item_name, &owner_id));
        Self {
            collection_id: req.collection_id,
            collection_name: non_blank(req.collection_name)
                .or_else(|| str_field(collection, COLLECTION_NAME).map(str::to_string))
                .unwrap_or_default(),
            collection_theme: non_blank(req.collection_theme)
                .or_else(|| str_field(collection, COLLECTION_THEME).map(str::to_string))
                .unwrap_or_default(),
            owner_name: req.owner_name.trim().to_string(),
            owner_id,
            item_name,
            item_image,
            likes: Vec::new(),
            custom_fields: req.custom_fields.unwrap_or_default(),
        }
    }
}

// ---- Collections ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    pub collection_name: String,
    pub collection_theme: String,
    pub collection_description: Option<String>,
    pub collection_image: Option<String>,
    pub owner_id: String,
    pub owner_name: String,
    pub custom_fields: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub collection_name: String,
    pub collection_theme: String,
    pub collection_description: String,
    pub collection_image: String,
    pub owner_id: String,
    pub owner_name: String,
    pub custom_fields: Vec<Value>,
    pub items_quantity: i64,
}

impl From<CreateCollectionRequest> for NewCollection {
    fn from(req: CreateCollectionRequest) -> Self {
        let collection_name = req.collection_name.trim().to_string();
        let owner_id = req.owner_id.trim().to_string();
        let collection_image =
            non_blank(req.collection_image).unwrap_or_else(|| default_avatar(&collection_name, &owner_id));
        Self {
            collection_theme: req.collection_theme.trim().to_string(),
            collection_description: req.collection_description.unwrap_or_default(),
            owner_name: req.owner_name.trim().to_string(),
            collection_name,
            collection_image,
            owner_id,
            custom_fields: req.custom_fields.unwrap_or_default(),
            items_quantity: 0,
        }
    }
}

// ---- Comments ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub item_id: String,
    pub author_id: String,
    pub author_name: String,
    pub comment_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub item_id: String,
    pub author_id: String,
    pub author_name: String,
    pub comment_text: String,
}

impl From<CreateCommentRequest> for NewComment {
    fn from(req: CreateCommentRequest) -> Self {
        Self {
            item_id: req.item_id,
            author_id: req.author_id.trim().to_string(),
            author_name: req.author_name.trim().to_string(),
            comment_text: req.comment_text.trim().to_string(),
        }
    }
}

// ---- Tags ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagRequest {
    pub tag_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTag {
    pub tag_name: String,
}
