use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::scheduler::SchedulerStatus;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub scheduler: SchedulerStatus,
    pub conversations: usize,
}

#[derive(Serialize)]
pub struct ConversationStatus {
    pub id: String,
    pub messages: usize,
    pub due: bool,
}

#[derive(Serialize)]
pub struct LoopCommandResult {
    /// Whether the command changed anything.
    pub changed: bool,
    pub active: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        scheduler: state.processing.status(),
        conversations: state.processing.queue().len(),
    })
}

pub async fn get_conversations(State(state): State<AdminState>) -> Json<Vec<ConversationStatus>> {
    let queue = state.processing.queue();
    let mut statuses: Vec<_> = queue
        .all_chats()
        .into_iter()
        .map(|id| ConversationStatus {
            messages: queue.history().len(&id),
            due: queue.is_due(&id),
            id: id.0,
        })
        .collect();
    statuses.sort_by(|a, b| a.id.cmp(&b.id));
    Json(statuses)
}

pub async fn start_loop(State(state): State<AdminState>) -> Json<LoopCommandResult> {
    let changed = state.processing.start();
    Json(LoopCommandResult {
        changed,
        active: state.processing.is_active(),
    })
}

pub async fn stop_loop(State(state): State<AdminState>) -> Json<LoopCommandResult> {
    let changed = state.processing.stop();
    Json(LoopCommandResult {
        changed,
        active: state.processing.is_active(),
    })
}
