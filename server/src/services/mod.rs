//! Services module
//!
//! Business logic services that coordinate between HTTP handlers and the repository.

pub mod auth;
pub mod card_nodes;
pub mod cards;
pub mod edges;
pub mod ideamap;
pub mod projects;
pub mod scheduler;
pub mod settings;
pub mod tags;

pub use auth::AuthService;
pub use card_nodes::CardNodesService;
pub use cards::CardsService;
pub use edges::EdgesService;
pub use ideamap::{IdeaMapService, LayoutRequest};
pub use projects::ProjectsService;
pub use scheduler::{Frequency, MaintenanceTask, SchedulerService};
pub use settings::{SettingsService, SettingsUpdate};
pub use tags::TagsService;
