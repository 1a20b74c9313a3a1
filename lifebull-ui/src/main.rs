//! 人生牛市 Dashboard
//!
//! Browser client for the Life Bull Market backend, built with Leptos (WASM).
//!
//! # Pages
//!
//! - `/auth`: phone + SMS code login with an optional inviter code
//! - `/profile`: birth form, invite card
//! - `/bazi/:analysis_id`: four-pillar preview of a submitted profile
//! - `/result/:analysis_id`: polls the analysis, then shows the report and
//!   the life K-line chart
//!
//! # Architecture
//!
//! This is a client-side rendered (CSR) Leptos application that compiles to
//! WebAssembly. Models, form rules, chart geometry and the poll policy come
//! from the `lifebull` crate; this crate adds fetch calls and views.

use leptos::*;

mod api;
mod app;
mod components;
mod pages;
mod state;

fn main() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();

    mount_to_body(|| view! { <app::App /> });
}
