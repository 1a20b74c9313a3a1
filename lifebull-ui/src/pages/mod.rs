//! Page Components
//!
//! One component per route.

pub mod auth;
pub mod bazi_preview;
pub mod profile;
pub mod result;

pub use auth::AuthPage;
pub use bazi_preview::BaziPreviewPage;
pub use profile::ProfilePage;
pub use result::ResultPage;
