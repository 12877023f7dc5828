//! Persisted UI state models.

use serde::{Deserialize, Serialize};

use super::Persisted;

/// Default width of the message list pane, in pixels.
pub const DEFAULT_INBOX_WIDTH: u32 = 350;
/// Default width of the sidebar, in pixels.
pub const DEFAULT_SIDEBAR_WIDTH: u32 = 250;
/// Narrowest a resizable pane may get, in pixels.
pub const MIN_PANE_WIDTH: u32 = 150;
/// Smallest message zoom factor.
pub const MIN_ZOOM: f64 = 0.5;
/// Largest message zoom factor.
pub const MAX_ZOOM: f64 = 3.0;
/// Zoom change per step.
pub const ZOOM_STEP: f64 = 0.1;

/// Viewport class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenSize {
    /// Narrower than 768 px.
    Mobile,
    /// 768 px up to 1024 px.
    Tablet,
    /// 1024 px and wider.
    #[default]
    Desktop,
}

impl ScreenSize {
    /// Classifies a viewport width in pixels.
    #[must_use]
    pub const fn from_width(width: u32) -> Self {
        if width < 768 {
            Self::Mobile
        } else if width < 1024 {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }
}

/// Pane layout and message display preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailLayout {
    /// Message list pane width.
    pub inbox_width: u32,
    /// Sidebar width.
    pub sidebar_width: u32,
    /// Whether the sidebar is collapsed.
    pub sidebar_collapsed: bool,
    /// Zoom factor of the message body.
    pub mail_content_zoom: f64,
    /// Whether rendered messages may load remote images and stylesheets.
    pub allow_remote_content: bool,
    /// Current viewport class.
    pub screen_size: ScreenSize,
    /// Whether the recipient list in the sidebar is collapsed.
    pub recipients_collapsed: bool,
}

impl Default for MailLayout {
    fn default() -> Self {
        Self {
            inbox_width: DEFAULT_INBOX_WIDTH,
            sidebar_width: DEFAULT_SIDEBAR_WIDTH,
            sidebar_collapsed: false,
            mail_content_zoom: 1.0,
            allow_remote_content: true,
            screen_size: ScreenSize::Desktop,
            recipients_collapsed: false,
        }
    }
}

impl Persisted for MailLayout {
    const STORE_ID: &'static str = "mailLayout";
}

impl MailLayout {
    /// Sets the message list width, no narrower than [`MIN_PANE_WIDTH`].
    pub fn set_inbox_width(&mut self, width: u32) {
        self.inbox_width = width.max(MIN_PANE_WIDTH);
    }

    /// Sets the sidebar width, no narrower than [`MIN_PANE_WIDTH`].
    pub fn set_sidebar_width(&mut self, width: u32) {
        self.sidebar_width = width.max(MIN_PANE_WIDTH);
    }

    /// Sets the zoom factor, clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`].
    ///
    /// Non-finite values reset the zoom to 1.0.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.mail_content_zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
    }

    /// Zooms in by one step.
    pub fn zoom_in(&mut self) {
        self.set_zoom(self.mail_content_zoom + ZOOM_STEP);
    }

    /// Zooms out by one step.
    pub fn zoom_out(&mut self) {
        self.set_zoom(self.mail_content_zoom - ZOOM_STEP);
    }

    /// Restores the default zoom.
    pub const fn reset_zoom(&mut self) {
        self.mail_content_zoom = 1.0;
    }

    /// Collapses or expands the sidebar.
    pub const fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }

    /// Collapses or expands the recipient list.
    pub const fn toggle_recipients(&mut self) {
        self.recipients_collapsed = !self.recipients_collapsed;
    }

    /// Reclassifies the viewport. Returns true if the class changed.
    pub fn update_screen_size(&mut self, width: u32) -> bool {
        let size = ScreenSize::from_width(width);
        let changed = size != self.screen_size;
        self.screen_size = size;
        changed
    }
}

/// Message list search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchState {
    /// Search text as typed.
    pub query: String,
}

impl Persisted for SearchState {
    const STORE_ID: &'static str = "search";
}

impl SearchState {
    /// Returns the trimmed query, or `None` when there is nothing to search.
    #[must_use]
    pub fn term(&self) -> Option<&str> {
        let term = self.query.trim();
        (!term.is_empty()).then_some(term)
    }

    /// Clears the query.
    pub fn clear(&mut self) {
        self.query.clear();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layout_defaults() {
        let layout = MailLayout::default();
        assert_eq!(layout.inbox_width, 350);
        assert_eq!(layout.sidebar_width, 250);
        assert!(!layout.sidebar_collapsed);
        assert_eq!(layout.mail_content_zoom, 1.0);
        assert!(layout.allow_remote_content);
        assert_eq!(layout.screen_size, ScreenSize::Desktop);
        assert!(!layout.recipients_collapsed);
    }

    #[test]
    fn test_layout_serializes_camel_case() {
        let value = serde_json::to_value(MailLayout::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "inboxWidth": 350,
                "sidebarWidth": 250,
                "sidebarCollapsed": false,
                "mailContentZoom": 1.0,
                "allowRemoteContent": true,
                "screenSize": "desktop",
                "recipientsCollapsed": false
            })
        );
    }

    #[test]
    fn test_layout_partial_state_fills_defaults() {
        let layout: MailLayout =
            serde_json::from_value(json!({"sidebarCollapsed": true, "screenSize": "mobile"}))
                .unwrap();
        assert!(layout.sidebar_collapsed);
        assert_eq!(layout.screen_size, ScreenSize::Mobile);
        assert_eq!(layout.inbox_width, DEFAULT_INBOX_WIDTH);
    }

    #[test]
    fn test_screen_size_from_width() {
        assert_eq!(ScreenSize::from_width(0), ScreenSize::Mobile);
        assert_eq!(ScreenSize::from_width(767), ScreenSize::Mobile);
        assert_eq!(ScreenSize::from_width(768), ScreenSize::Tablet);
        assert_eq!(ScreenSize::from_width(1023), ScreenSize::Tablet);
        assert_eq!(ScreenSize::from_width(1024), ScreenSize::Desktop);
    }

    #[test]
    fn test_update_screen_size() {
        let mut layout = MailLayout::default();
        assert!(!layout.update_screen_size(1920));
        assert!(layout.update_screen_size(800));
        assert_eq!(layout.screen_size, ScreenSize::Tablet);
    }

    #[test]
    fn test_widths_clamped() {
        let mut layout = MailLayout::default();
        layout.set_inbox_width(10);
        layout.set_sidebar_width(600);
        assert_eq!(layout.inbox_width, MIN_PANE_WIDTH);
        assert_eq!(layout.sidebar_width, 600);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut layout = MailLayout::default();
        layout.set_zoom(10.0);
        assert_eq!(layout.mail_content_zoom, MAX_ZOOM);
        layout.zoom_in();
        assert_eq!(layout.mail_content_zoom, MAX_ZOOM);

        layout.set_zoom(0.55);
        layout.zoom_out();
        assert_eq!(layout.mail_content_zoom, MIN_ZOOM);

        layout.set_zoom(f64::NAN);
        assert_eq!(layout.mail_content_zoom, 1.0);
    }

    #[test]
    fn test_toggles() {
        let mut layout = MailLayout::default();
        layout.toggle_sidebar();
        layout.toggle_recipients();
        assert!(layout.sidebar_collapsed);
        assert!(layout.recipients_collapsed);
        layout.toggle_sidebar();
        assert!(!layout.sidebar_collapsed);
    }

    #[test]
    fn test_search_term() {
        let mut search = SearchState::default();
        assert_eq!(search.term(), None);

        search.query = "  invoice ".to_string();
        assert_eq!(search.term(), Some("invoice"));

        search.query = "   ".to_string();
        assert_eq!(search.term(), None);

        search.clear();
        assert!(search.query.is_empty());
    }
}
