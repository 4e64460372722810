//! Per-session connection object.
//!
//! Each connected client session owns exactly one ChatSession. The
//! session carries the process-wide presence heartbeat (stops only on
//! close) and the read-tracking loop for the single conversation
//! currently in view (cancelled on every switch). There are no hidden
//! module-level subscription handles: teardown is dropping the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::ConversationSummary;
use crate::realtime::{ChangeEvent, Topic};
use crate::services::conversation_service::ConversationService;
use crate::services::delivery_service::DeliveryService;
use crate::services::presence_service::PresenceService;
use crate::state::AppState;

/// The one reconciliation operation behind both delivery paths: the
/// periodic safety-net poll and explicit reconnect recovery run this
/// same function, so duplicate-event handling lives in exactly one
/// place. Re-runs mark-read for the conversation in view, then reloads
/// the conversation list.
pub async fn reconcile(
    state: &AppState,
    user_id: Uuid,
    viewed: Option<Uuid>,
) -> AppResult<Vec<ConversationSummary>> {
    if let Some(conversation_id) = viewed {
        DeliveryService::mark_read(&state.db, &state.bus, conversation_id, user_id).await?;
    }
    ConversationService::list(&state.db, user_id).await
}

pub struct ChatSession {
    state: AppState,
    user_id: Uuid,
    viewed: Arc<RwLock<Option<Uuid>>>,
    heartbeat: Option<JoinHandle<()>>,
    read_loop: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Open a session for an authenticated user and start its presence
    /// heartbeat. The first beat fires immediately, then on the
    /// configured interval. A failed beat is dropped; the next tick
    /// supersedes it.
    pub fn open(state: AppState, user_id: Uuid) -> Self {
        let heartbeat_state = state.clone();
        let heartbeat = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(
                heartbeat_state.config.heartbeat_seconds,
            ));
            loop {
                tick.tick().await;
                if let Err(e) = PresenceService::heartbeat(
                    &heartbeat_state.db,
                    &heartbeat_state.bus,
                    user_id,
                    true,
                )
                .await
                {
                    tracing::warn!("heartbeat for {} failed: {}", user_id, e);
                }
            }
        });

        Self {
            state,
            user_id,
            viewed: Arc::new(RwLock::new(None)),
            heartbeat: Some(heartbeat),
            read_loop: None,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub async fn viewed_conversation(&self) -> Option<Uuid> {
        *self.viewed.read().await
    }

    /// Switch the session's active conversation: cancel the previous
    /// read-tracking loop, subscribe to the new conversation's events,
    /// mark it read, and start polling it. The presence heartbeat is
    /// never touched by a switch. In-flight sends are unaffected.
    pub async fn view_conversation(
        &mut self,
        conversation_id: Uuid,
    ) -> AppResult<UnboundedReceiver<ChangeEvent>> {
        self.leave_conversation().await;

        let rx = self
            .state
            .bus
            .subscribe(&self.state.db, Topic::Conversation(conversation_id), self.user_id)
            .await?;

        DeliveryService::mark_read(&self.state.db, &self.state.bus, conversation_id, self.user_id)
            .await?;
        *self.viewed.write().await = Some(conversation_id);

        let state = self.state.clone();
        let user_id = self.user_id;
        let viewed = self.viewed.clone();
        self.read_loop = Some(tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_secs(state.config.reconcile_seconds));
            tick.tick().await; // the switch itself just reconciled
            loop {
                tick.tick().await;
                let Some(current) = *viewed.read().await else {
                    break;
                };
                if let Err(e) = reconcile(&state, user_id, Some(current)).await {
                    tracing::warn!("reconcile for {} failed: {}", user_id, e);
                }
            }
        }));

        Ok(rx)
    }

    /// Stop tracking the active conversation. Does not cancel the
    /// presence heartbeat.
    pub async fn leave_conversation(&mut self) {
        if let Some(handle) = self.read_loop.take() {
            handle.abort();
        }
        *self.viewed.write().await = None;
    }

    /// Full reconciliation on demand, e.g. after the caller detects a
    /// dead subscription and re-subscribes.
    pub async fn reconcile(&self) -> AppResult<Vec<ConversationSummary>> {
        let viewed = *self.viewed.read().await;
        reconcile(&self.state, self.user_id, viewed).await
    }

    /// Graceful teardown on logout/unload: stop both loops and send a
    /// best-effort offline beat. An ungraceful disconnect skips this and
    /// leaves a stale online row until the staleness window expires it.
    pub async fn close(mut self) {
        if let Some(handle) = self.read_loop.take() {
            handle.abort();
        }
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
        if let Err(e) =
            PresenceService::heartbeat(&self.state.db, &self.state.bus, self.user_id, false).await
        {
            tracing::warn!("offline beat for {} failed: {}", self.user_id, e);
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(handle) = self.read_loop.take() {
            handle.abort();
        }
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
    }
}
