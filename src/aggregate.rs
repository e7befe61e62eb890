use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::cache::ReferenceCache;
use crate::classify::{ConversationKind, classify};
use crate::client::RemoteHistoryClient;
use crate::history::HistoryFetcher;
use crate::model::{Message, TimeWindow};
use crate::Result;

/// Messages per conversation, grouped by kind and keyed by caption
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Histories {
    by_kind: HashMap<ConversationKind, BTreeMap<String, Vec<Message>>>,
}

impl Histories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `messages` under `caption`, returning what was there before
    pub fn insert(
        &mut self,
        kind: ConversationKind,
        caption: String,
        messages: Vec<Message>,
    ) -> Option<Vec<Message>> {
        self.by_kind.entry(kind).or_default().insert(caption, messages)
    }

    pub fn get(&self, kind: ConversationKind) -> Option<&BTreeMap<String, Vec<Message>>> {
        self.by_kind.get(&kind)
    }

    pub fn messages(&self, kind: ConversationKind, caption: &str) -> Option<&[Message]> {
        self.get(kind)
            .and_then(|by_caption| by_caption.get(caption))
            .map(Vec::as_slice)
    }

    pub fn total_messages(&self) -> usize {
        self.by_kind
            .values()
            .flat_map(|by_caption| by_caption.values())
            .map(Vec::len)
            .sum()
    }

    /// JSON-friendly view keyed by pluralized kind, e.g. `channels`
    pub fn by_plural(&self) -> BTreeMap<&'static str, &BTreeMap<String, Vec<Message>>> {
        self.by_kind
            .iter()
            .map(|(kind, by_caption)| (kind.plural(), by_caption))
            .collect()
    }
}

impl Serialize for Histories {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.by_plural().serialize(serializer)
    }
}

/// One titled block of the final report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub messages: Vec<Message>,
}

pub fn section_title(kind: ConversationKind, caption: &str, interval_label: &str) -> String {
    format!(
        "History for slack {} {} ({})",
        kind.as_str(),
        caption,
        interval_label
    )
}

/// Flatten `histories` into report sections.
///
/// Kinds come in [`ConversationKind::REPORT_ORDER`], captions in sorted
/// order within a kind. Conversations without messages get no section.
pub fn regroup(histories: &Histories, interval_label: &str) -> Vec<Section> {
    let mut sections = Vec::new();

    for kind in ConversationKind::REPORT_ORDER {
        let Some(by_caption) = histories.get(kind) else {
            continue;
        };
        for (caption, messages) in by_caption {
            if messages.is_empty() {
                continue;
            }
            sections.push(Section {
                title: section_title(kind, caption, interval_label),
                messages: messages.clone(),
            });
        }
    }

    sections
}

pub struct HistoryAggregator<'a, 'c, C> {
    cache: &'a ReferenceCache<'c, C>,
    fetcher: &'a HistoryFetcher<'c, C>,
}

impl<'a, 'c, C: RemoteHistoryClient> HistoryAggregator<'a, 'c, C> {
    pub fn new(cache: &'a ReferenceCache<'c, C>, fetcher: &'a HistoryFetcher<'c, C>) -> Self {
        Self { cache, fetcher }
    }

    /// Fetch every visible conversation for `window`.
    ///
    /// Any failure aborts the whole run. When two conversations of one kind
    /// share a caption the one listed last wins.
    pub async fn all_histories(&self, window: &TimeWindow) -> Result<Histories> {
        let conversations = self.cache.conversations().await?;
        let mut histories = Histories::new();

        for conversation in conversations.iter() {
            let (kind, caption) = classify(conversation, self.cache).await?;
            let messages = self.fetcher.fetch(&conversation.id, window).await?;

            tracing::info!(
                conversation = %conversation.id,
                kind = %kind,
                caption = %caption,
                count = messages.len(),
                "fetched conversation history"
            );

            if histories.insert(kind, caption.clone(), messages).is_some() {
                tracing::warn!(
                    kind = %kind,
                    caption = %caption,
                    conversation = %conversation.id,
                    "duplicate caption, earlier conversation overwritten"
                );
            }
        }

        Ok(histories)
    }
}
