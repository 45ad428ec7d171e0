pub mod audit;
pub mod categories;
pub mod ndas;
pub mod offers;
pub mod password_reset_tokens;
pub mod payments;
pub mod project_images;
pub mod project_views;
pub mod projects;
pub mod refresh_tokens;
pub mod stats;
pub mod term_sheets;
pub mod users;
