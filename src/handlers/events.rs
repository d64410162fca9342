use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::models::event::{parse_event_id, EventChanges, EventView, NewEvent, PageRequest};
use crate::payload::EventForm;
use crate::state::AppState;
use crate::uploads::UploadedImage;
use crate::utils::error::AppError;
use crate::utils::response::{created, success, DeletedResponse, UpdatedResponse};

const LATEST: &str = "latest";

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// `GET /events`: one event by `?id=`, or a page of `?type=latest`.
#[instrument(skip(state, query))]
pub async fn get_events(
    State(state): State<AppState>,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::ValidationError(e.body_text()))?;

    if let Some(raw_id) = query.id.as_deref().filter(|id| !id.trim().is_empty()) {
        let id = parse_event_id(raw_id)?;
        let event = state
            .store
            .find_by_id(&id)
            .await
            .map_err(AppError::database("Failed to fetch event"))?
            .ok_or_else(|| AppError::NotFound("Event not found by provided id.".to_string()))?;

        return Ok(success(EventView::from(event)));
    }

    if query.kind.as_deref() == Some(LATEST) {
        let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref())?;
        let events = state
            .store
            .list_latest(&page)
            .await
            .map_err(AppError::database("Failed to fetch events"))?;

        let views: Vec<EventView> = events.into_iter().map(EventView::from).collect();
        return Ok(success(views));
    }

    Err(AppError::ValidationError(
        "Provide either an id or type=latest query parameter.".to_string(),
    ))
}

#[instrument(skip(state, form))]
pub async fn create_event(
    State(state): State<AppState>,
    form: EventForm,
) -> Result<Response, AppError> {
    let input = NewEvent::from_fields(&form.fields)?;
    let image = store_image(&state, form.image.as_ref()).await?;

    let event = input.into_event(state.default_uid, image.clone(), Utc::now());
    if let Err(e) = state.store.insert(&event).await {
        discard_image(&state, image.as_deref()).await;
        return Err(AppError::database("Failed to create event")(e));
    }

    info!(event_id = %event.id, "Event created");
    Ok(created(event.id.to_hex(), "Event created successfully"))
}

#[instrument(skip(state, path, form))]
pub async fn update_event(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    form: EventForm,
) -> Result<Response, AppError> {
    let Path(raw_id) = path.map_err(|e| AppError::ValidationError(e.body_text()))?;
    let id = parse_event_id(&raw_id)?;
    let changes = EventChanges::from_fields(&form.fields)?;

    let existing = state
        .store
        .find_by_id(&id)
        .await
        .map_err(AppError::database("Failed to update event"))?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let image = store_image(&state, form.image.as_ref()).await?;
    let changes = EventChanges {
        image: image.clone(),
        ..changes
    }
    .touched(existing.updated_at, Utc::now());

    let outcome = match state.store.update(&id, &changes).await {
        Ok(outcome) => outcome,
        Err(e) => {
            discard_image(&state, image.as_deref()).await;
            return Err(AppError::database("Failed to update event")(e));
        }
    };

    if outcome.matched == 0 {
        warn!(event_id = %id, "Event was removed before the update was applied");
        discard_image(&state, image.as_deref()).await;
    } else {
        info!(event_id = %id, modified = outcome.modified, "Event updated");
    }

    Ok(success(UpdatedResponse {
        message: "Event updated successfully".to_string(),
        modified_count: outcome.modified,
    }))
}

#[instrument(skip(state, path))]
pub async fn delete_event(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(raw_id) = path.map_err(|e| AppError::ValidationError(e.body_text()))?;
    let id = parse_event_id(&raw_id)?;

    let deleted = state
        .store
        .delete(&id)
        .await
        .map_err(AppError::database("Failed to delete event"))?;

    if deleted == 0 {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    info!(event_id = %id, "Event deleted");
    Ok(success(DeletedResponse {
        message: "Event deleted successfully".to_string(),
        deleted_count: deleted,
    }))
}

/// `PUT`/`DELETE /events/` without an id segment.
pub async fn missing_event_id() -> AppError {
    AppError::ValidationError("Event ID is required".to_string())
}

async fn store_image(
    state: &AppState,
    image: Option<&UploadedImage>,
) -> Result<Option<String>, AppError> {
    let Some(image) = image else {
        return Ok(None);
    };

    state
        .uploads
        .save(image)
        .await
        .map(Some)
        .map_err(|source| AppError::UploadError {
            message: "Failed to store image",
            source,
        })
}

async fn discard_image(state: &AppState, filename: Option<&str>) {
    if let Some(filename) = filename {
        state.uploads.discard(filename).await;
    }
}
