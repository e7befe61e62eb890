//! In-memory stand-in for the Slack Web API used across the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Value, json};

use crate::client::{Params, RemoteHistoryClient};
use crate::model::{Conversation, Message, Timestamp, User};
use crate::Result;

#[derive(Default)]
pub struct FakeSlack {
    users: Vec<User>,
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<Message>>,
    raw: HashMap<String, Value>,
    endless_history: bool,
    directory_page_size: Option<usize>,
    calls: Mutex<Vec<(String, Params)>>,
}

pub fn message(ts: i64, user: Option<&str>, text: &str) -> Message {
    Message {
        ts: Timestamp::from_seconds(ts),
        user: user.map(str::to_string),
        text: text.to_string(),
    }
}

pub fn channel(id: &str, name: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        is_channel: true,
        is_group: false,
        is_im: false,
        is_mpim: false,
        name: Some(name.to_string()),
        name_normalized: Some(name.to_string()),
        user: None,
    }
}

pub fn group(id: &str, name: &str) -> Conversation {
    Conversation {
        is_channel: false,
        is_group: true,
        ..channel(id, name)
    }
}

pub fn mpim(id: &str, name: &str) -> Conversation {
    Conversation {
        is_channel: false,
        is_mpim: true,
        ..channel(id, name)
    }
}

pub fn im(id: &str, user: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        is_channel: false,
        is_group: false,
        is_im: true,
        is_mpim: false,
        name: None,
        name_normalized: None,
        user: Some(user.to_string()),
    }
}

impl FakeSlack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: &str, name: &str) -> Self {
        self.users.push(User {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversations.push(conversation);
        self
    }

    pub fn with_messages(mut self, channel: &str, messages: Vec<Message>) -> Self {
        self.messages
            .entry(channel.to_string())
            .or_default()
            .extend(messages);
        self
    }

    /// Answer `method` with `body` verbatim
    pub fn with_raw(mut self, method: &str, body: Value) -> Self {
        self.raw.insert(method.to_string(), body);
        self
    }

    /// History pages always claim there is more to fetch
    pub fn with_endless_history(mut self) -> Self {
        self.endless_history = true;
        self
    }

    /// Split directory listings into pages of `size` entries
    pub fn with_directory_page_size(mut self, size: usize) -> Self {
        self.directory_page_size = Some(size);
        self
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls().iter().filter(|(m, _)| m == method).count()
    }

    fn directory_page<T: serde::Serialize>(&self, items: &[T], key: &str, params: &Params) -> Value {
        let start: usize = params
            .get("cursor")
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        let size = self.directory_page_size.unwrap_or(items.len().max(1));
        let end = (start + size).min(items.len());
        let next_cursor = if end < items.len() {
            end.to_string()
        } else {
            String::new()
        };

        let mut body = json!({
            "ok": true,
            "response_metadata": {"next_cursor": next_cursor},
        });
        body[key] = json!(items.get(start..end).unwrap_or(&[]));
        body
    }

    fn history(&self, params: &Params) -> Value {
        let Some(stored) = params.get("channel").and_then(|c| self.messages.get(c)) else {
            return json!({"ok": true, "messages": [], "has_more": self.endless_history});
        };
        let parse = |key: &str| params.get(key).and_then(|v| Timestamp::parse(v));
        let oldest = parse("oldest").unwrap_or_default();
        let latest = parse("latest");
        let inclusive = params.get("inclusive").map(String::as_str) == Some("true");
        let count: usize = params
            .get("count")
            .and_then(|c| c.parse().ok())
            .unwrap_or(100);

        let mut matching: Vec<&Message> = stored
            .iter()
            .filter(|m| m.ts >= oldest)
            .filter(|m| match latest {
                Some(latest) if inclusive => m.ts <= latest,
                Some(latest) => m.ts < latest,
                None => true,
            })
            .collect();
        matching.sort_by(|a, b| b.ts.cmp(&a.ts));

        let has_more = self.endless_history || matching.len() > count;
        matching.truncate(count);

        json!({"ok": true, "messages": matching, "has_more": has_more})
    }
}

impl RemoteHistoryClient for FakeSlack {
    async fn execute(&self, method: &str, params: &Params) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));

        if let Some(body) = self.raw.get(method) {
            return Ok(body.clone());
        }

        Ok(match method {
            "users.list" => self.directory_page(&self.users, "members", params),
            "users.conversations" => self.directory_page(&self.conversations, "channels", params),
            "conversations.history" => self.history(params),
            _ => json!({"ok": false, "error": "unknown_method"}),
        })
    }
}
