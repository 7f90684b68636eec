use chatline_core::{ChatClient, ChatController, ChatError, DisplayMode, RequestId, Resolution};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation, draft and status text all live in the controller
    pub controller: ChatController,
    pub client: ChatClient,

    // Draft cursor, in chars
    pub cursor: usize,

    // Chat list scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel area for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    // Where spawned sends post their results
    reply_tx: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(client: ChatClient, controller: ChatController, reply_tx: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            controller,
            client,
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            chat_area: None,
            reply_tx,
        }
    }

    /// Submit the draft and deliver it on a background task.
    ///
    /// Returns false if the draft was blank and nothing was sent.
    pub fn send_draft(&mut self) -> bool {
        let Some(outbound) = self.controller.submit() else {
            return false;
        };

        let client = self.client.clone();
        let tx = self.reply_tx.clone();
        let span = outbound.span();
        tokio::spawn(
            async move {
                let result = client.send(&outbound.text).await;
                // Receiver is gone only when the app is shutting down
                let _ = tx.send(AppEvent::Reply {
                    id: outbound.id,
                    result,
                });
            }
            .instrument(span),
        );

        self.clamp_cursor();
        self.scroll_to_bottom();
        true
    }

    pub fn apply_reply(&mut self, id: RequestId, result: Result<String, ChatError>) {
        if self.controller.resolve(id, result) != Resolution::Stale {
            self.clamp_cursor();
            self.scroll_to_bottom();
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.controller.draft_chars());
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.controller.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.visible_height() / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.visible_height() / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Paragraph scroll offsets are u16, so clamp here
    fn max_scroll(&self) -> u16 {
        let overflow = self
            .total_chat_lines()
            .saturating_sub(self.visible_height() as usize);
        overflow.min(u16::MAX as usize) as u16
    }

    /// Rendered line count of the chat panel, after wrapping
    pub fn total_chat_lines(&self) -> usize {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let wrapped = |text: &str| -> usize {
            text.lines()
                .map(|line| {
                    // Use character count, not byte length, for proper UTF-8 handling
                    let char_count = line.chars().count();
                    if char_count == 0 {
                        1
                    } else {
                        (char_count - 1) / wrap_width + 1
                    }
                })
                .fold(0usize, usize::saturating_add)
                .max(1)
        };

        let mut total_lines: usize = 0;

        match self.controller.display_mode() {
            DisplayMode::History => {
                for msg in self.controller.conversation().messages() {
                    // Role line ("You:" or "AI:"), content, blank line after message
                    total_lines = total_lines
                        .saturating_add(wrapped(&msg.content))
                        .saturating_add(2);
                }
            }
            DisplayMode::SingleReply => {
                if let Some(text) = self.controller.display_text() {
                    total_lines = total_lines.saturating_add(wrapped(text));
                }
            }
        }

        if self.controller.is_sending() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        total_lines
    }
}
