//! Autocomplete for mentions, hashtags and emoji.
//!
//! `complete()` returns the trigger range to replace together with the
//! candidates, so accepting an item is a single [`TextEdit`]. Mention and
//! hashtag candidates come from a [`CandidateStore`] the host can swap out at
//! any time; emoji come from the built-in shortcode table.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use smol_str::{SmolStr, format_smolstr};

use crate::config::EngineConfig;
use crate::emoji::{self, EMOJI};
use crate::text::TextBuffer;
use crate::types::TextEdit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// `@handle`
    Mention,
    /// `#tag`
    Hashtag,
    /// `:shortcode:`
    Emoji,
}

impl TriggerKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '@' => Some(Self::Mention),
            '#' => Some(Self::Hashtag),
            ':' => Some(Self::Emoji),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Mention => '@',
            Self::Hashtag => '#',
            Self::Emoji => ':',
        }
    }
}

/// An open trigger: the trigger character up to the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub kind: TriggerKind,
    /// From the trigger character to the cursor.
    pub range: Range<usize>,
    /// Text typed after the trigger character.
    pub query: SmolStr,
}

/// A mention or hashtag the host knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Shown in the menu, e.g. a display name.
    pub label: SmolStr,
    /// Inserted after the trigger character, e.g. a handle.
    pub value: SmolStr,
    pub aliases: Vec<SmolStr>,
}

impl Candidate {
    pub fn new(label: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        [self.label.as_str(), self.value.as_str()]
            .into_iter()
            .chain(self.aliases.iter().map(SmolStr::as_str))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub mentions: Vec<Candidate>,
    pub hashtags: Vec<Candidate>,
}

/// Shared, host-mutable candidate lists. Clones share the same lists; the
/// autocomplete reads them at trigger time.
#[derive(Debug, Clone, Default)]
pub struct CandidateStore(Rc<RefCell<Candidates>>);

impl CandidateStore {
    pub fn new(candidates: Candidates) -> Self {
        Self(Rc::new(RefCell::new(candidates)))
    }

    pub fn set_mentions(&self, mentions: Vec<Candidate>) {
        self.0.borrow_mut().mentions = mentions;
    }

    pub fn set_hashtags(&self, hashtags: Vec<Candidate>) {
        self.0.borrow_mut().hashtags = hashtags;
    }

    pub fn replace(&self, candidates: Candidates) {
        *self.0.borrow_mut() = candidates;
    }

    pub fn read<R>(&self, f: impl FnOnce(&Candidates) -> R) -> R {
        f(&self.0.borrow())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Mention,
    Hashtag,
    Emoji,
    /// Offer to use the typed query as a new mention or tag.
    Create,
}

/// A single completion suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    /// The text to display in the menu.
    pub label: SmolStr,
    /// Replaces the trigger range when accepted.
    pub insert_text: SmolStr,
    /// Shown next to the label (the handle, or the emoji glyph).
    pub detail: Option<SmolStr>,
    pub kind: CompletionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub trigger: Trigger,
    pub items: Vec<CompletionItem>,
}

impl CompletionResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Find an open trigger ending at `cursor`.
///
/// The trigger character must sit within `lookback` bytes of the cursor on
/// the same line, at line start or after whitespace, with no whitespace
/// between it and the cursor.
pub fn find_trigger(
    text: &dyn TextBuffer,
    cursor: usize,
    config: &EngineConfig,
) -> Option<Trigger> {
    let cursor = cursor.min(text.len_bytes());
    let line_start = text.line_to_byte(text.byte_to_line(cursor));
    let before = text.slice(line_start..cursor);

    let mut window = before.len().saturating_sub(config.autocomplete_lookback);
    while !before.is_char_boundary(window) {
        window += 1;
    }

    for (i, c) in before[window..].char_indices().rev() {
        if c.is_whitespace() {
            return None;
        }
        let Some(kind) = TriggerKind::from_char(c) else {
            continue;
        };
        let at = window + i;
        let opens = at == 0
            || before[..at]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        if !opens {
            // `a:b`, `me@host`: a trigger char mid-word ends the search
            return None;
        }
        let query = &before[at + c.len_utf8()..];
        if kind == TriggerKind::Emoji
            && (query.len() < config.emoji_min_query || !query.chars().all(emoji::is_code_char))
        {
            return None;
        }
        return Some(Trigger {
            kind,
            range: line_start + at..cursor,
            query: query.into(),
        });
    }
    None
}

/// Rank of a candidate against a lowercased query: 0 for a prefix match on
/// any key, 1 for a substring match.
fn rank<'a>(keys: impl Iterator<Item = &'a str>, query: &str) -> Option<u8> {
    let mut best = None;
    for key in keys {
        let key = key.to_lowercase();
        if key.starts_with(query) {
            return Some(0);
        }
        if key.contains(query) {
            best = Some(1);
        }
    }
    best
}

/// Keep matching items, prefix matches first, in their original order
/// otherwise.
fn filter_ranked<T>(items: impl Iterator<Item = (T, Option<u8>)>, limit: usize) -> Vec<T> {
    let mut ranked: Vec<(u8, T)> = items
        .filter_map(|(item, rank)| rank.map(|rank| (rank, item)))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().take(limit).map(|(_, item)| item).collect()
}

pub struct Autocomplete {
    config: EngineConfig,
    store: CandidateStore,
}

impl Autocomplete {
    pub fn new(config: &EngineConfig, store: CandidateStore) -> Self {
        Self {
            config: config.clone(),
            store,
        }
    }

    pub fn store(&self) -> &CandidateStore {
        &self.store
    }

    /// Suggestions for the trigger ending at `cursor`, if one is open.
    pub fn complete(&self, text: &dyn TextBuffer, cursor: usize) -> Option<CompletionResult> {
        let trigger = find_trigger(text, cursor, &self.config)?;
        let items = match trigger.kind {
            TriggerKind::Emoji => self.emoji_items(&trigger.query),
            TriggerKind::Mention | TriggerKind::Hashtag => self.store.read(|candidates| {
                let list = match trigger.kind {
                    TriggerKind::Mention => &candidates.mentions,
                    _ => &candidates.hashtags,
                };
                self.candidate_items(trigger.kind, list, &trigger.query)
            }),
        };
        tracing::trace!(
            target: "weaver::live_preview::autocomplete",
            kind = ?trigger.kind,
            query = %trigger.query,
            items = items.len(),
            "completion"
        );
        Some(CompletionResult { trigger, items })
    }

    /// The edit accepting `item` makes: the trigger range becomes the item's
    /// text and a space.
    pub fn accept(&self, trigger: &Trigger, item: &CompletionItem) -> TextEdit {
        TextEdit {
            range: trigger.range.clone(),
            insert: format!("{} ", item.insert_text),
        }
    }

    fn candidate_items(
        &self,
        kind: TriggerKind,
        list: &[Candidate],
        query: &str,
    ) -> Vec<CompletionItem> {
        let needle = query.to_lowercase();
        let prefix = kind.as_char();
        let completion_kind = match kind {
            TriggerKind::Mention => CompletionKind::Mention,
            _ => CompletionKind::Hashtag,
        };

        let mut items = filter_ranked(
            list.iter().map(|c| (c, rank(c.keys(), &needle))),
            self.config.max_suggestions,
        )
        .into_iter()
        .map(|c| CompletionItem {
            label: c.label.clone(),
            insert_text: format_smolstr!("{prefix}{}", c.value),
            detail: (c.label != c.value).then(|| format_smolstr!("{prefix}{}", c.value)),
            kind: completion_kind,
        })
        .collect::<Vec<_>>();

        let exact = list
            .iter()
            .any(|c| c.keys().any(|key| key.eq_ignore_ascii_case(query)));
        if !query.is_empty() && !exact {
            items.push(CompletionItem {
                label: format_smolstr!("Create {prefix}{query}"),
                insert_text: format_smolstr!("{prefix}{query}"),
                detail: None,
                kind: CompletionKind::Create,
            });
        }
        items
    }

    fn emoji_items(&self, query: &str) -> Vec<CompletionItem> {
        let needle = query.to_lowercase();
        filter_ranked(
            EMOJI
                .iter()
                .map(|(code, glyph)| ((*code, *glyph), rank(std::iter::once(*code), &needle))),
            self.config.max_suggestions,
        )
        .into_iter()
        .map(|(code, glyph)| CompletionItem {
            label: format_smolstr!(":{code}:"),
            insert_text: format_smolstr!(":{code}:"),
            detail: Some(SmolStr::new(glyph)),
            kind: CompletionKind::Emoji,
        })
        .collect()
    }
}
