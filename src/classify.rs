use std::fmt;

use serde::Serialize;

use crate::cache::ReferenceCache;
use crate::client::RemoteHistoryClient;
use crate::model::Conversation;
use crate::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConversationKind {
    Channel,
    Group,
    MultiPartyIm,
    DirectMessage,
}

impl ConversationKind {
    /// Order in which report sections are emitted
    pub const REPORT_ORDER: [ConversationKind; 4] = [
        ConversationKind::Channel,
        ConversationKind::DirectMessage,
        ConversationKind::Group,
        ConversationKind::MultiPartyIm,
    ];

    /// Kind implied by the API flags. `is_im` wins over the others, then
    /// `is_mpim`, `is_channel` and `is_group`.
    pub fn from_flags(conversation: &Conversation) -> Option<Self> {
        if conversation.is_im {
            Some(Self::DirectMessage)
        } else if conversation.is_mpim {
            Some(Self::MultiPartyIm)
        } else if conversation.is_channel {
            Some(Self::Channel)
        } else if conversation.is_group {
            Some(Self::Group)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Group => "group",
            Self::MultiPartyIm => "mpim",
            Self::DirectMessage => "im",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Self::Channel => "channels",
            Self::Group => "groups",
            Self::MultiPartyIm => "mpims",
            Self::DirectMessage => "ims",
        }
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind and caption of a conversation.
///
/// Direct messages are captioned with the counterpart's user name, which
/// loads the user directory on first use. Other kinds use the normalized
/// name, then the plain name, then the id.
pub async fn classify<C: RemoteHistoryClient>(
    conversation: &Conversation,
    cache: &ReferenceCache<'_, C>,
) -> Result<(ConversationKind, String)> {
    let kind = ConversationKind::from_flags(conversation)
        .ok_or_else(|| AppError::UnclassifiableConversation(conversation.id.clone()))?;

    let caption = match kind {
        ConversationKind::DirectMessage => {
            let user = conversation
                .user
                .as_deref()
                .ok_or_else(|| AppError::UnclassifiableConversation(conversation.id.clone()))?;
            cache.user_name(user).await?.to_string()
        }
        ConversationKind::Channel | ConversationKind::Group | ConversationKind::MultiPartyIm => {
            conversation
                .name_normalized
                .as_deref()
                .or(conversation.name.as_deref())
                .unwrap_or(&conversation.id)
                .to_string()
        }
    };

    Ok((kind, caption))
}
