use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use agent_chat::{ChatClient, ChatError, ChatReply, ChatResult, ChatWidget};

pub struct App {
    pub should_quit: bool,
    pub widget: ChatWidget,
    pub client: ChatClient,

    /// The one request allowed in flight, spawned so the UI keeps drawing
    pub pending: Option<JoinHandle<ChatResult<ChatReply>>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Chat pane area from the last render, for mouse hit-testing and paging
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(client: ChatClient) -> Self {
        Self {
            should_quit: false,
            widget: ChatWidget::new(),
            client,
            pending: None,
            animation_frame: 0,
            chat_area: None,
        }
    }

    /// Start sending the current input, if the widget accepts it
    pub fn submit(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let Some(message) = self.widget.begin_submit() else {
            return;
        };

        debug!(chars = message.chars().count(), "sending chat message");
        let client = self.client.clone();
        self.animation_frame = 0;
        self.pending = Some(tokio::spawn(async move { client.send(&message).await }));
    }

    /// Hand a finished request's outcome to the widget. No-op while it runs.
    pub async fn poll_pending(&mut self) {
        let finished = self.pending.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }
        if let Some(task) = self.pending.take() {
            let outcome = task.await.unwrap_or_else(|e| {
                error!(error = %e, "chat request task failed");
                Err(ChatError::TaskFailed(e.to_string()))
            });
            self.widget.finish_submit(outcome);
        }
    }

    /// Wait for the pending request regardless of how long it takes
    #[cfg(test)]
    pub async fn wait_pending(&mut self) {
        if let Some(task) = self.pending.take() {
            let outcome = task
                .await
                .unwrap_or_else(|e| Err(ChatError::TaskFailed(e.to_string())));
            self.widget.finish_submit(outcome);
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.widget.is_in_flight() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(task) = self.pending.take() {
            debug!("aborting in-flight chat request on exit");
            task.abort();
        }
    }
}
