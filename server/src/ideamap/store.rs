//! Per-session canvas state

use super::interaction::{ConnectionController, Selection};
use super::layout::LayoutDirection;
use crate::services::settings::{Settings, ThemeMode};

/// UI state for one open idea map.
///
/// Owned by whoever drives the canvas and handed to the pieces that need it.
#[derive(Debug, Clone, Default)]
pub struct IdeaMapStore {
    pub selection: Selection,
    pub theme: ThemeMode,
    pub layout_direction: LayoutDirection,
    pub connection: ConnectionController,
}

impl IdeaMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a user's saved preferences
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            theme: settings.theme.mode,
            layout_direction: settings.layout.direction,
            ..Self::default()
        }
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.theme = theme;
    }

    pub fn set_layout_direction(&mut self, direction: LayoutDirection) {
        self.layout_direction = direction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ideamap::interaction::ClickModifiers;
    use crate::services::settings::default_settings;

    #[test]
    fn test_from_settings() {
        let mut settings = default_settings();
        settings.theme.mode = ThemeMode::Dark;
        settings.layout.direction = LayoutDirection::LR;

        let store = IdeaMapStore::from_settings(&settings);
        assert_eq!(store.theme, ThemeMode::Dark);
        assert_eq!(store.layout_direction, LayoutDirection::LR);
        assert!(store.selection.is_empty());
        assert!(!store.connection.is_connecting());
    }

    #[test]
    fn test_stores_are_independent() {
        let mut first = IdeaMapStore::new();
        let second = IdeaMapStore::new();

        first.selection.on_node_click("a", ClickModifiers::default());
        first.set_theme(ThemeMode::Light);

        assert!(second.selection.is_empty());
        assert_eq!(second.theme, ThemeMode::System);
    }
}
