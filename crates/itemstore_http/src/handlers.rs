//! Route handlers translating HTTP requests into item service calls.

use crate::error::ApiError;
use crate::inflect;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use itemstore_core::{
    is_valid_token, Attributes, CreateItem, Item, PatchKind, TOKEN_PATTERN,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `GET /{typePlural}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItemsResponse {
    pub items: Vec<Item>,
}

pub(crate) async fn create_item(
    State(state): State<AppState>,
    Path(type_plural): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let kind = resolve_type(&type_plural)?;
    let object = decode_object(&body)?;

    let name = match object.get("name") {
        None => return Err(ApiError::bad_request("name field is not provided")),
        Some(Value::String(name)) if is_valid_token(name) => name.clone(),
        Some(_) => {
            return Err(ApiError::bad_request(format!(
                "name field is not valid, it should be a string that matches the regex '{TOKEN_PATTERN}'"
            )))
        }
    };

    let request = CreateItem {
        name,
        attributes: Attributes::from_map(object),
    };
    let item = state.service().create(&state.context(), &kind, request)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub(crate) async fn list_items(
    State(state): State<AppState>,
    Path(type_plural): Path<String>,
) -> Result<Json<ListItemsResponse>, ApiError> {
    let kind = resolve_type(&type_plural)?;
    let items = state.service().list(&state.context(), &kind)?;
    Ok(Json(ListItemsResponse { items }))
}

pub(crate) async fn read_item(
    State(state): State<AppState>,
    Path((type_plural, name)): Path<(String, String)>,
) -> Result<Json<Item>, ApiError> {
    let kind = resolve_type(&type_plural)?;
    validate_name(&name)?;
    let item = state.service().get(&state.context(), &kind, &name)?;
    Ok(Json(item))
}

pub(crate) async fn replace_item(
    State(state): State<AppState>,
    Path((type_plural, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Item>, ApiError> {
    let kind = resolve_type(&type_plural)?;
    validate_name(&name)?;
    let object = decode_object(&body)?;

    let item = state.service().replace(
        &state.context(),
        &kind,
        &name,
        Attributes::from_map(object),
    )?;
    Ok(Json(item))
}

pub(crate) async fn patch_item(
    State(state): State<AppState>,
    Path((type_plural, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Item>, ApiError> {
    let kind = resolve_type(&type_plural)?;
    validate_name(&name)?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let patch_kind = PatchKind::from_content_type(content_type)?;

    let document: Value = serde_json::from_slice(&body).map_err(|err| {
        ApiError::bad_request("error on decode request body").with_cause(err)
    })?;

    let item = state.service().patch_with_kind(
        &state.context(),
        &kind,
        &name,
        patch_kind,
        &document,
    )?;
    Ok(Json(item))
}

pub(crate) async fn delete_item(
    State(state): State<AppState>,
    Path((type_plural, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind = resolve_type(&type_plural)?;
    validate_name(&name)?;
    state.service().delete(&state.context(), &kind, &name)?;
    Ok(StatusCode::NO_CONTENT)
}

fn resolve_type(type_plural: &str) -> Result<String, ApiError> {
    if !inflect::is_plural(type_plural) {
        return Err(ApiError::bad_request(
            "you should set plural form of the type",
        ));
    }

    let kind = inflect::singularize(type_plural);
    if !is_valid_token(&kind) {
        return Err(ApiError::bad_request(format!(
            "type parameter is not valid, it should be a string that matches the regex '{TOKEN_PATTERN}'"
        )));
    }
    Ok(kind)
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if is_valid_token(name) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "name parameter is not valid, it should be a string that matches the regex '{TOKEN_PATTERN}'"
        )))
    }
}

fn decode_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(ApiError::bad_request("request body must be a JSON object")),
        Err(err) => Err(ApiError::bad_request("error on decode request body").with_cause(err)),
    }
}
