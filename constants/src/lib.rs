/// Shared constant tables for the blueprint view renderer
pub mod animation;
pub mod beam;
pub mod coordinate_system;
pub mod firing;
pub mod render_settings;
