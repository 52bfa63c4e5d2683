//! TUI widgets for the Love Simulator

pub mod choices;
pub mod favorability;
pub mod input;
pub mod scene;
pub mod toast;

pub use choices::ChoicesWidget;
pub use favorability::FavorabilityGauge;
pub use input::InputWidget;
pub use scene::SceneWidget;
pub use toast::ToastWidget;
