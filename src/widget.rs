//! The chat widget: one input field, one message list, one request at a time.
//!
//! The widget never draws. Views read [`ChatWidget::messages`] and
//! [`ChatWidget::input`] and feed key edits and submissions back in.

use tracing::{debug, info, trace, warn};

use crate::client::{ChatClient, ChatReply};
use crate::error::ChatResult;
use crate::state::{InputState, Message, Role};

/// Shown in place of a reply when the request or its body parse failed
pub const CONNECT_FAILURE: &str = "Failed to connect to server.";

/// Prefix for errors reported by the server in its JSON body
pub const ERROR_PREFIX: &str = "Error: ";

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text input with a character cursor
#[derive(Debug, Default)]
pub struct InputField {
    value: String,
    cursor: usize, // in chars, not bytes
    state: InputState,
    focused: bool,
}

impl InputField {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_enabled(&self) -> bool {
        self.state == InputState::Enabled
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn set_value(&mut self, value: &str) {
        if !self.is_enabled() {
            return;
        }
        self.value = value.to_string();
        self.cursor = self.value.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        if !self.is_enabled() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if !self.is_enabled() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if !self.is_enabled() {
            return;
        }
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn disable(&mut self) {
        self.state = InputState::Disabled;
        self.focused = false;
    }

    fn enable(&mut self) {
        self.state = InputState::Enabled;
    }
}

/// Append-only list of messages, newest last
#[derive(Debug, Default)]
pub struct MessageList {
    messages: Vec<Message>,
    /// Lines scrolled up from the bottom. 0 keeps the newest message in view.
    scroll_from_bottom: u16,
}

impl MessageList {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn scroll_from_bottom(&self) -> u16 {
        self.scroll_from_bottom
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    /// Views call this when the offset exceeds what can actually be scrolled
    pub fn clamp_scroll(&mut self, max: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.min(max);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.scroll_to_bottom();
    }
}

/// Bridges one input field to the chat endpoint and keeps the exchange
#[derive(Debug)]
pub struct ChatWidget {
    input: InputField,
    messages: MessageList,
    in_flight: bool,
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatWidget {
    pub fn new() -> Self {
        let mut input = InputField::default();
        input.focus();
        Self {
            input,
            messages: MessageList::default(),
            in_flight: false,
        }
    }

    pub fn input(&self) -> &InputField {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputField {
        &mut self.input
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.messages()
    }

    pub fn message_list(&self) -> &MessageList {
        &self.messages
    }

    pub fn message_list_mut(&mut self) -> &mut MessageList {
        &mut self.messages
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Append a message verbatim and bring it into view
    pub fn append_message(&mut self, text: impl Into<String>, role: Role) {
        let message = Message::new(role, text);
        trace!(role = role.as_str(), chars = message.text.chars().count(), "message appended");
        self.messages.push(message);
    }

    /// Accept the current input for sending.
    ///
    /// Returns the trimmed message when accepted: the user message has been
    /// appended, the input cleared and disabled. Returns `None` without any
    /// side effect when the input is blank or a request is already pending.
    pub fn begin_submit(&mut self) -> Option<String> {
        if self.in_flight || !self.input.is_enabled() {
            debug!("submit ignored, request already in flight");
            return None;
        }

        let message = self.input.value().trim().to_string();
        if message.is_empty() {
            return None;
        }

        self.append_message(message.clone(), Role::User);
        self.input.clear();
        self.input.disable();
        self.in_flight = true;

        Some(message)
    }

    /// Render the outcome of the pending request and hand the input back
    pub fn finish_submit(&mut self, outcome: ChatResult<ChatReply>) {
        match outcome {
            Ok(ChatReply::Response(text)) => self.append_message(text, Role::Agent),
            Ok(ChatReply::Error(error)) => {
                info!(%error, "chat server reported an error");
                self.append_message(format!("{}{}", ERROR_PREFIX, error), Role::Agent);
            }
            Ok(ChatReply::Unrecognized) => {
                warn!("chat server reply had neither `response` nor `error`, ignoring");
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                self.append_message(CONNECT_FAILURE, Role::Agent);
            }
        }

        self.in_flight = false;
        self.input.enable();
        self.input.focus();
    }

    /// Full submit cycle around one awaited request
    pub async fn submit(&mut self, client: &ChatClient) {
        let Some(message) = self.begin_submit() else {
            return;
        };
        let outcome = client.send(&message).await;
        self.finish_submit(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn server_replying(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn typed(text: &str) -> ChatWidget {
        let mut widget = ChatWidget::new();
        widget.input_mut().set_value(text);
        widget
    }

    fn pairs(widget: &ChatWidget) -> Vec<(Role, &str)> {
        widget
            .messages()
            .iter()
            .map(|m| (m.role, m.text.as_str()))
            .collect()
    }

    #[test]
    fn test_begin_submit_appends_trimmed_user_message() {
        let mut widget = typed("   hello world \t");

        let sent = widget.begin_submit();

        assert_eq!(sent.as_deref(), Some("hello world"));
        assert_eq!(pairs(&widget), vec![(Role::User, "hello world")]);
        assert_eq!(widget.input().value(), "");
        assert!(!widget.input().is_enabled());
        assert!(widget.is_in_flight());
    }

    #[test]
    fn test_blank_input_is_a_no_op() {
        for blank in ["", "   ", "\t\n "] {
            let mut widget = typed(blank);
            assert_eq!(widget.begin_submit(), None);
            assert!(widget.messages().is_empty());
            assert!(widget.input().is_enabled());
            assert!(!widget.is_in_flight());
        }
    }

    #[test]
    fn test_second_submit_while_in_flight_is_rejected() {
        let mut widget = typed("first");
        assert!(widget.begin_submit().is_some());

        // Re-enable behind the widget's back; the in-flight flag alone must hold
        widget.input.enable();
        widget.input_mut().set_value("second");
        assert_eq!(widget.begin_submit(), None);
        assert_eq!(widget.messages().len(), 1);
    }

    #[test]
    fn test_disabled_input_ignores_edits() {
        let mut widget = typed("x");
        widget.begin_submit();
        widget.input_mut().insert_char('a');
        widget.input_mut().backspace();
        assert_eq!(widget.input().value(), "");
    }

    #[test]
    fn test_input_editing_is_utf8_safe() {
        let mut widget = ChatWidget::new();
        for c in "héllo".chars() {
            widget.input_mut().insert_char(c);
        }
        widget.input_mut().move_home();
        widget.input_mut().move_right();
        widget.input_mut().delete();
        assert_eq!(widget.input().value(), "hllo");
        widget.input_mut().move_end();
        widget.input_mut().backspace();
        assert_eq!(widget.input().value(), "hll");
        assert_eq!(widget.input().cursor(), 3);
    }

    #[test]
    fn test_append_scrolls_to_newest() {
        let mut widget = ChatWidget::new();
        widget.append_message("a", Role::User);
        widget.message_list_mut().scroll_up(5);
        assert_eq!(widget.message_list().scroll_from_bottom(), 5);
        widget.append_message("b", Role::Agent);
        assert_eq!(widget.message_list().scroll_from_bottom(), 0);
    }

    #[test]
    fn test_agent_text_kept_byte_for_byte() {
        let mut widget = typed("x");
        widget.begin_submit();
        let raw = "  <b>not markup</b>\n  ";
        widget.finish_submit(Ok(ChatReply::Response(raw.to_string())));
        assert_eq!(widget.messages()[1].text, raw);
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        let server = server_replying(
            ResponseTemplate::new(200).set_body_json(json!({"response": "hi there"})),
        )
        .await;
        let client = ChatClient::new(&server.uri());
        let mut widget = typed("hello");

        widget.submit(&client).await;

        assert_eq!(
            pairs(&widget),
            vec![(Role::User, "hello"), (Role::Agent, "hi there")]
        );
        assert!(widget.input().is_enabled());
        assert!(widget.input().is_focused());
        assert!(!widget.is_in_flight());
    }

    #[tokio::test]
    async fn test_server_error_is_prefixed() {
        let server = server_replying(
            ResponseTemplate::new(429).set_body_json(json!({"error": "rate limited"})),
        )
        .await;
        let client = ChatClient::new(&server.uri());
        let mut widget = typed("x");

        widget.submit(&client).await;

        assert_eq!(widget.messages()[1], Message::new(Role::Agent, "Error: rate limited"));
    }

    #[tokio::test]
    async fn test_unreachable_server_shows_fixed_message() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = ChatClient::new(&format!("http://{}", addr));
        let mut widget = typed("x");

        widget.submit(&client).await;

        assert_eq!(widget.messages()[1], Message::new(Role::Agent, CONNECT_FAILURE));
        assert!(widget.input().is_enabled());
    }

    #[tokio::test]
    async fn test_malformed_json_shows_fixed_message() {
        let server = server_replying(ResponseTemplate::new(200).set_body_string("not json")).await;
        let client = ChatClient::new(&server.uri());
        let mut widget = typed("x");

        widget.submit(&client).await;

        assert_eq!(widget.messages()[1].text, CONNECT_FAILURE);
    }

    #[tokio::test]
    async fn test_null_body_shows_fixed_message() {
        let server = server_replying(ResponseTemplate::new(200).set_body_string("null")).await;
        let client = ChatClient::new(&server.uri());
        let mut widget = typed("x");

        widget.submit(&client).await;

        assert_eq!(pairs(&widget), vec![(Role::User, "x"), (Role::Agent, CONNECT_FAILURE)]);
        assert!(widget.input().is_enabled());
    }

    #[tokio::test]
    async fn test_non_string_fields_follow_truthiness() {
        let number = server_replying(ResponseTemplate::new(200).set_body_json(json!({"response": 42}))).await;
        let object = server_replying(ResponseTemplate::new(200).set_body_json(json!({"error": {"code": 1}}))).await;
        let falsy = server_replying(ResponseTemplate::new(200).set_body_json(json!({"error": false}))).await;
        let zero = server_replying(ResponseTemplate::new(200).set_body_json(json!({"error": 0}))).await;

        let mut widget = ChatWidget::new();
        for server in [&number, &object, &falsy, &zero] {
            widget.input_mut().set_value("q");
            widget.submit(&ChatClient::new(&server.uri())).await;
        }

        assert_eq!(
            pairs(&widget),
            vec![
                (Role::User, "q"),
                (Role::Agent, "42"),
                (Role::User, "q"),
                (Role::Agent, "Error: [object Object]"),
                (Role::User, "q"),
                (Role::User, "q"),
            ]
        );
    }

    #[tokio::test]
    async fn test_unrecognized_reply_appends_nothing() {
        let server = server_replying(ResponseTemplate::new(200).set_body_json(json!({}))).await;
        let client = ChatClient::new(&server.uri());
        let mut widget = typed("x");

        widget.submit(&client).await;

        assert_eq!(pairs(&widget), vec![(Role::User, "x")]);
        assert!(widget.input().is_enabled());
        assert!(widget.input().is_focused());
    }

    #[tokio::test]
    async fn test_blank_submit_sends_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "no"})))
            .expect(0)
            .mount(&mock_server)
            .await;
        let client = ChatClient::new(&mock_server.uri());
        let mut widget = typed("   ");

        widget.submit(&client).await;

        assert!(widget.messages().is_empty());
    }

    #[tokio::test]
    async fn test_input_always_recovers_across_outcomes() {
        let ok = server_replying(ResponseTemplate::new(200).set_body_json(json!({"response": "a"}))).await;
        let err = server_replying(ResponseTemplate::new(500).set_body_json(json!({"error": "b"}))).await;
        let empty = server_replying(ResponseTemplate::new(200).set_body_json(json!({}))).await;
        let broken = server_replying(ResponseTemplate::new(502).set_body_string("bad gateway")).await;

        let mut widget = ChatWidget::new();
        for server in [&ok, &err, &empty, &broken] {
            widget.input_mut().set_value("ping");
            widget.submit(&ChatClient::new(&server.uri())).await;
            assert!(widget.input().is_enabled());
            assert!(widget.input().is_focused());
            assert!(!widget.is_in_flight());
        }

        assert_eq!(
            pairs(&widget),
            vec![
                (Role::User, "ping"),
                (Role::Agent, "a"),
                (Role::User, "ping"),
                (Role::Agent, "Error: b"),
                (Role::User, "ping"),
                (Role::User, "ping"),
                (Role::Agent, CONNECT_FAILURE),
            ]
        );
    }
}
