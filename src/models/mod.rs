pub mod audit_event;
pub mod category;
pub mod nda;
pub mod offer;
pub mod payment;
pub mod project;
pub mod term_sheet;
pub mod token;
pub mod user;

pub use audit_event::*;
pub use category::*;
pub use nda::*;
pub use offer::*;
pub use payment::*;
pub use project::*;
pub use term_sheet::*;
pub use token::*;
pub use user::*;
