//! Session controller
//!
//! `ChatController` is the single owner of everything a chat view shows: the
//! conversation, the draft being typed, and the status/reply text. Front ends
//! read through the getters and change state only through the methods here.
//!
//! A send is split in two so the network call can run elsewhere:
//! [`ChatController::submit`] validates the draft, records the user message and
//! hands back an [`Outbound`]; the caller delivers it and later passes the
//! result to [`ChatController::resolve`]. Every submit gets a fresh
//! [`RequestId`] and only the newest one is applied, so replies that arrive
//! out of order can't overwrite a later answer.

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::client::ChatTransport;
use crate::error::ChatError;
use crate::state::Conversation;

/// When the draft is cleared after a send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DraftClearPolicy {
    /// Clear once the reply comes back successfully, unless the draft was edited meanwhile.
    #[default]
    OnSuccess,
    /// Clear as soon as the message is submitted.
    OnAttempt,
}

/// How the view presents the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Full multi-turn history; errors go to a status line.
    #[default]
    History,
    /// Only the latest reply (or error) is shown.
    SingleReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A submitted message waiting to be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub id: RequestId,
    pub text: String,
}

impl Outbound {
    /// Span to run the delivery in, so transport log lines carry the request id
    pub fn span(&self) -> tracing::Span {
        tracing::debug_span!("chat_send", request_id = self.id.get())
    }
}

/// What `resolve` did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Replied,
    Failed,
    /// A newer request was issued; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    id: RequestId,
    draft_revision: u64,
}

#[derive(Debug, Default)]
pub struct ChatController {
    conversation: Conversation,
    draft: String,
    draft_revision: u64,
    display_text: Option<String>,
    clear_policy: DraftClearPolicy,
    display_mode: DisplayMode,
    next_id: u64,
    pending: Option<Pending>,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl ChatController {
    pub fn new(clear_policy: DraftClearPolicy, display_mode: DisplayMode) -> Self {
        Self {
            clear_policy,
            display_mode,
            ..Self::default()
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Error text in history mode; reply or error text in single-reply mode.
    pub fn display_text(&self) -> Option<&str> {
        self.display_text.as_deref()
    }

    pub fn clear_policy(&self) -> DraftClearPolicy {
        self.clear_policy
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// True while the most recent request has not resolved.
    pub fn is_sending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn draft_chars(&self) -> usize {
        self.draft.chars().count()
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.draft_revision += 1;
    }

    pub fn insert_char(&mut self, char_idx: usize, c: char) {
        let byte_pos = char_to_byte_index(&self.draft, char_idx);
        self.draft.insert(byte_pos, c);
        self.draft_revision += 1;
    }

    /// Remove the character at `char_idx`. Returns false if out of range.
    pub fn remove_char(&mut self, char_idx: usize) -> bool {
        if char_idx >= self.draft_chars() {
            return false;
        }
        let byte_pos = char_to_byte_index(&self.draft, char_idx);
        self.draft.remove(byte_pos);
        self.draft_revision += 1;
        true
    }

    fn clear_draft(&mut self) {
        self.draft.clear();
        self.draft_revision += 1;
    }

    /// Validate the draft and record it as a user message.
    ///
    /// Returns `None` without touching any state when the draft is empty or
    /// whitespace-only.
    pub fn submit(&mut self) -> Option<Outbound> {
        if self.draft.trim().is_empty() {
            return None;
        }

        self.next_id += 1;
        let id = RequestId(self.next_id);
        let text = self.draft.clone();

        self.conversation.append_user_message(text.clone());

        if self.clear_policy == DraftClearPolicy::OnAttempt {
            self.clear_draft();
        }

        self.pending = Some(Pending {
            id,
            draft_revision: self.draft_revision,
        });

        tracing::debug!(request_id = id.get(), "message submitted");
        Some(Outbound { id, text })
    }

    /// Fold the result of a delivered `Outbound` back into the session.
    pub fn resolve(&mut self, id: RequestId, result: Result<String, ChatError>) -> Resolution {
        let pending = match self.pending {
            Some(p) if p.id == id => p,
            _ => {
                tracing::debug!(request_id = id.get(), "discarding stale reply");
                return Resolution::Stale;
            }
        };
        self.pending = None;

        match result {
            Ok(reply) => {
                self.display_text = match self.display_mode {
                    DisplayMode::History => None,
                    DisplayMode::SingleReply => Some(reply.clone()),
                };
                self.conversation.append_assistant_message(reply);

                if self.clear_policy == DraftClearPolicy::OnSuccess
                    && self.draft_revision == pending.draft_revision
                {
                    self.clear_draft();
                }
                tracing::debug!(request_id = id.get(), "reply applied");
                Resolution::Replied
            }
            Err(err) => {
                tracing::warn!(request_id = id.get(), error = %err, "chat request failed");
                self.display_text = err.display_text();
                Resolution::Failed
            }
        }
    }

    /// Submit the draft, deliver it through `transport`, and apply the result.
    ///
    /// Returns `None` if the draft was rejected and nothing was sent.
    pub async fn send_via<T>(&mut self, transport: &T) -> Option<Resolution>
    where
        T: ChatTransport + ?Sized,
    {
        let outbound = self.submit()?;
        let result = transport
            .send(&outbound.text)
            .instrument(outbound.span())
            .await;
        Some(self.resolve(outbound.id, result))
    }
}
