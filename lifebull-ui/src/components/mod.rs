//! UI Components
//!
//! Reusable Leptos components shared by the pages.

pub mod chart;
pub mod footer;
pub mod loading;
pub mod nav;

pub use chart::LifeKLineChart;
pub use footer::Footer;
pub use loading::{InlineLoading, Loading};
pub use nav::Nav;
