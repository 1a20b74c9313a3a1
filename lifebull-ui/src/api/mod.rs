//! API Client Module

mod client;

pub use client::*;
