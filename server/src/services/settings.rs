//! Settings service
//!
//! Per-user preferences stored as one JSON document. Updates arrive one
//! section at a time and are shallow-merged into the stored document.

use crate::config::{MAX_AUTO_SAVE_DELAY_MS, MIN_AUTO_SAVE_DELAY_MS};
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::ideamap::LayoutDirection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

/// Canvas background pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundVariant {
    #[default]
    Dots,
    Lines,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct IdeaMapSettings {
    pub background: BackgroundVariant,
    pub grid_gap: u32,
    pub snap_to_grid: bool,
    pub show_minimap: bool,
    pub zoom_on_scroll: bool,
    /// Edge type given to newly drawn connections
    pub edge_type: String,
    pub animated_edges: bool,
}

impl Default for IdeaMapSettings {
    fn default() -> Self {
        Self {
            background: BackgroundVariant::Dots,
            grid_gap: 16,
            snap_to_grid: false,
            show_minimap: true,
            zoom_on_scroll: true,
            edge_type: crate::config::DEFAULT_EDGE_TYPE.to_string(),
            animated_edges: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CardSettings {
    pub width: u32,
    pub height: u32,
    pub border_radius: u32,
    pub show_tags: bool,
    pub font_size: u32,
}

impl Default for CardSettings {
    fn default() -> Self {
        Self {
            width: 260,
            height: 120,
            border_radius: 8,
            show_tags: true,
            font_size: 14,
        }
    }
}

/// Connection handle appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HandleSettings {
    pub size: u32,
    pub color: String,
    pub show_on_hover: bool,
}

impl Default for HandleSettings {
    fn default() -> Self {
        Self {
            size: 8,
            color: "#555555".to_string(),
            show_on_hover: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LayoutSettings {
    pub rank_sep: f64,
    pub node_sep: f64,
    pub direction: LayoutDirection,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            rank_sep: crate::config::DEFAULT_RANK_SEP,
            node_sep: crate::config::DEFAULT_NODE_SEP,
            direction: LayoutDirection::TB,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneralSettings {
    pub auto_save: bool,
    /// Debounce before an edited card is saved (100ms to 5 minutes)
    pub auto_save_delay_ms: u32,
    pub confirm_delete: bool,
    pub language: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            auto_save: true,
            auto_save_delay_ms: 1000,
            confirm_delete: true,
            language: "ko".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ThemeSettings {
    pub mode: ThemeMode,
    pub accent_color: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            mode: ThemeMode::System,
            accent_color: "#3b82f6".to_string(),
        }
    }
}

/// A user's full settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    pub idea_map: IdeaMapSettings,
    pub card: CardSettings,
    pub handle: HandleSettings,
    pub layout: LayoutSettings,
    pub general: GeneralSettings,
    pub theme: ThemeSettings,
}

pub fn default_settings() -> Settings {
    Settings::default()
}

macro_rules! section_patch {
    ($patch:ident => $section:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
        #[serde(rename_all = "camelCase", deny_unknown_fields)]
        pub struct $patch {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl $patch {
            pub fn apply_to(&self, section: &mut $section) {
                $(
                    if let Some(value) = &self.$field {
                        section.$field = value.clone();
                    }
                )*
            }
        }
    };
}

section_patch!(IdeaMapPatch => IdeaMapSettings {
    background: BackgroundVariant,
    grid_gap: u32,
    snap_to_grid: bool,
    show_minimap: bool,
    zoom_on_scroll: bool,
    edge_type: String,
    animated_edges: bool,
});

section_patch!(CardPatch => CardSettings {
    width: u32,
    height: u32,
    border_radius: u32,
    show_tags: bool,
    font_size: u32,
});

section_patch!(HandlePatch => HandleSettings {
    size: u32,
    color: String,
    show_on_hover: bool,
});

section_patch!(LayoutPatch => LayoutSettings {
    rank_sep: f64,
    node_sep: f64,
    direction: LayoutDirection,
});

section_patch!(GeneralPatch => GeneralSettings {
    auto_save: bool,
    auto_save_delay_ms: u32,
    confirm_delete: bool,
    language: String,
});

section_patch!(ThemePatch => ThemeSettings {
    mode: ThemeMode,
    accent_color: String,
});

/// Partial update of one section.
///
/// Wire form: `{"section": "ideaMap", "values": {"gridGap": 24}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "section",
    content = "values",
    rename_all = "camelCase",
    deny_unknown_fields
)]
pub enum SettingsUpdate {
    IdeaMap(IdeaMapPatch),
    Card(CardPatch),
    Handle(HandlePatch),
    Layout(LayoutPatch),
    General(GeneralPatch),
    Theme(ThemePatch),
}

/// Shallow-merge `update` into its section. Other sections are copied unchanged.
pub fn merge_settings(existing: Option<&Settings>, update: &SettingsUpdate) -> Settings {
    let mut merged = existing.cloned().unwrap_or_default();

    match update {
        SettingsUpdate::IdeaMap(patch) => patch.apply_to(&mut merged.idea_map),
        SettingsUpdate::Card(patch) => patch.apply_to(&mut merged.card),
        SettingsUpdate::Handle(patch) => patch.apply_to(&mut merged.handle),
        SettingsUpdate::Layout(patch) => patch.apply_to(&mut merged.layout),
        SettingsUpdate::General(patch) => patch.apply_to(&mut merged.general),
        SettingsUpdate::Theme(patch) => patch.apply_to(&mut merged.theme),
    }

    merged
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    let positive = [
        ("ideaMap.gridGap", settings.idea_map.grid_gap as f64),
        ("card.width", settings.card.width as f64),
        ("card.height", settings.card.height as f64),
        ("card.fontSize", settings.card.font_size as f64),
        ("handle.size", settings.handle.size as f64),
        ("layout.rankSep", settings.layout.rank_sep),
        ("layout.nodeSep", settings.layout.node_sep),
    ];

    for (name, value) in positive {
        if !(value > 0.0 && value.is_finite()) {
            return Err(AppError::Validation(format!("{} must be positive", name)));
        }
    }

    let delay = settings.general.auto_save_delay_ms;
    if !(MIN_AUTO_SAVE_DELAY_MS..=MAX_AUTO_SAVE_DELAY_MS).contains(&delay) {
        return Err(AppError::Validation(format!(
            "general.autoSaveDelayMs must be between {} and {}",
            MIN_AUTO_SAVE_DELAY_MS, MAX_AUTO_SAVE_DELAY_MS
        )));
    }

    Ok(())
}

/// Service for per-user settings
#[derive(Clone)]
pub struct SettingsService {
    repo: Repository,
}

impl SettingsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Stored settings, or the defaults (which are then persisted) for a new user
    pub async fn get(&self, user_id: &str) -> Result<Settings> {
        match self.repo.get_user_settings(user_id).await? {
            Some(content) => serde_json::from_str(&content)
                .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e))),
            None => {
                tracing::info!("No settings for user {}, storing defaults", user_id);
                let defaults = default_settings();
                self.save(user_id, &defaults).await?;
                Ok(defaults)
            }
        }
    }

    pub async fn update(&self, user_id: &str, update: &SettingsUpdate) -> Result<Settings> {
        let current = self.get(user_id).await?;
        let merged = merge_settings(Some(&current), update);
        validate_settings(&merged)?;

        self.save(user_id, &merged).await?;
        tracing::info!("Settings updated for user {}", user_id);
        Ok(merged)
    }

    pub async fn reset(&self, user_id: &str) -> Result<Settings> {
        let defaults = default_settings();
        self.save(user_id, &defaults).await?;
        tracing::info!("Settings reset for user {}", user_id);
        Ok(defaults)
    }

    async fn save(&self, user_id: &str, settings: &Settings) -> Result<()> {
        let content = serde_json::to_string(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;
        self.repo.set_user_settings(user_id, &content).await
    }
}
