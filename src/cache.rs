//! Users and conversations directories, loaded once per run.

use std::collections::HashMap;

use tokio::sync::OnceCell;

use crate::client::{Params, RemoteHistoryClient, call};
use crate::model::{Conversation, ConversationsPage, User, UsersPage};
use crate::{AppError, Result};

const DIRECTORY_PAGE_LIMIT: usize = 200;
const CONVERSATION_TYPES: &str = "public_channel,private_channel,mpim,im";

/// Conversations in the order the API listed them, indexed by id
#[derive(Debug, Default)]
pub struct ConversationDirectory {
    conversations: Vec<Conversation>,
    by_id: HashMap<String, usize>,
}

impl ConversationDirectory {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        let by_id = conversations
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.id.clone(), idx))
            .collect();
        Self {
            conversations,
            by_id,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.by_id
            .get(id)
            .and_then(|idx| self.conversations.get(*idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

pub type UserDirectory = HashMap<String, User>;

/// Lazily loaded reference data shared by classification and rendering.
///
/// Each directory is fetched in full on first access and never refreshed.
/// Concurrent first accesses wait on the same load.
pub struct ReferenceCache<'c, C> {
    client: &'c C,
    users: OnceCell<UserDirectory>,
    conversations: OnceCell<ConversationDirectory>,
}

impl<'c, C: RemoteHistoryClient> ReferenceCache<'c, C> {
    pub fn new(client: &'c C) -> Self {
        Self {
            client,
            users: OnceCell::new(),
            conversations: OnceCell::new(),
        }
    }

    pub async fn users(&self) -> Result<&UserDirectory> {
        self.users.get_or_try_init(|| self.load_users()).await
    }

    pub async fn conversations(&self) -> Result<&ConversationDirectory> {
        self.conversations
            .get_or_try_init(|| self.load_conversations())
            .await
    }

    pub async fn user_name(&self, id: &str) -> Result<&str> {
        self.users()
            .await?
            .get(id)
            .map(|user| user.name.as_str())
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    async fn load_users(&self) -> Result<UserDirectory> {
        let mut users = UserDirectory::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = directory_params(cursor.as_deref(), &[]);
            let page: UsersPage = call(self.client, "users.list", &params).await?;

            users.extend(page.members.into_iter().map(|u| (u.id.clone(), u)));

            match page.response_metadata.as_ref().and_then(|m| m.next_cursor()) {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        tracing::info!(count = users.len(), "loaded user directory");
        Ok(users)
    }

    async fn load_conversations(&self) -> Result<ConversationDirectory> {
        let mut conversations = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = directory_params(cursor.as_deref(), &[("types", CONVERSATION_TYPES)]);
            let page: ConversationsPage = call(self.client, "users.conversations", &params).await?;

            conversations.extend(page.channels);

            match page.response_metadata.as_ref().and_then(|m| m.next_cursor()) {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        tracing::info!(count = conversations.len(), "loaded conversation directory");
        Ok(ConversationDirectory::new(conversations))
    }
}

fn directory_params(cursor: Option<&str>, extra: &[(&str, &str)]) -> Params {
    let mut params: Params = extra
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    params.insert("limit".to_string(), DIRECTORY_PAGE_LIMIT.to_string());
    if let Some(cursor) = cursor {
        params.insert("cursor".to_string(), cursor.to_string());
    }
    params
}
