use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{require_student, Caller};
use crate::models::{Message, StudentData};
use crate::state::AppState;
use crate::store::Store;
use crate::{proceeds, Error, Payload};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewMessage {
    pub recipient_id: Option<String>,
    pub recipient_name: Option<String>,
    pub content: Option<String>,
}

/// Appends a message from `sender`. Messages are never edited afterwards.
pub async fn post_message(
    store: &dyn Store,
    sender: &StudentData,
    input: NewMessage,
) -> Result<Message, Error> {
    let field = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::validation("recipientId, recipientName, content required"))
    };
    let recipient_id = field(input.recipient_id)?;
    let recipient_name = field(input.recipient_name)?;
    let content = field(input.content)?;

    let message = Message {
        id: Uuid::new_v4(),
        sender_id: sender.id.to_string(),
        sender_name: sender.full_name(),
        recipient_id,
        recipient_name,
        content,
        read: false,
        created_at: Utc::now(),
    };
    store.insert_message(&message).await?;
    Ok(message)
}

/// Full thread of a student, both directions, oldest first.
pub async fn list_messages(store: &dyn Store, student_id: Uuid) -> Result<Vec<Message>, Error> {
    store.messages_for(&student_id.to_string()).await
}

pub async fn list(State(state): State<AppState>, caller: Caller) -> Payload<Vec<Message>> {
    let student = require_student(&state, &caller).await?;
    proceeds(list_messages(state.store.as_ref(), student.id).await?)
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<NewMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), Error> {
    let Json(input) = body?;
    let student = require_student(&state, &caller).await?;
    let message = post_message(state.store.as_ref(), &student, input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
