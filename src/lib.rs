//! # Life Bull Market
//!
//! Client core for 人生牛市: a birth-chart fortune report with a "life K-line"
//! candlestick chart, one candle per year of age.
//!
//! ## Modules
//!
//! - [`models`]: request/response shapes of the backend API
//! - [`forms`]: login and birth-profile form state
//! - [`session`]: token and bazi cache over a key/value store
//! - [`routes`]: page routes and the auth guard
//! - [`poll`]: the fixed 3 second result polling policy
//! - [`chart`]: K-line transforms and plot geometry
//! - [`error`]: client errors and their display text
//!
//! With the `native` feature (on by default) the crate also provides the
//! reqwest [`client`], a file-backed [`store`], TOML [`config`] loading and
//! the terminal [`report`] renderer used by the `lifebull` binary. Without
//! it, the crate builds for `wasm32-unknown-unknown` and backs the dashboard.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lifebull::{ApiClient, Config, FileStore, Poller, PollOutcome, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let api = ApiClient::from_config(&config)?;
//!     let session = Session::new(FileStore::open(config.data_dir()));
//!
//!     let token = api.verify_code("13900000001", "123456", None).await?.access_token;
//!     session.set_token(Some(&token))?;
//!
//!     let cancel = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     let source = api.analysis_source(&token);
//!     let outcome = Poller::new(config.poll_interval())
//!         .run(&source, 1, |d| println!("{}", d.status), cancel)
//!         .await;
//!
//!     if let PollOutcome::Settled(detail) = outcome {
//!         println!("{:?}", detail.destiny());
//!     }
//!     Ok(())
//! }
//! ```

pub mod chart;
pub mod error;
pub mod forms;
pub mod models;
pub mod poll;
pub mod routes;
pub mod session;

#[cfg(feature = "native")]
pub mod client;
#[cfg(feature = "native")]
pub mod config;
#[cfg(feature = "native")]
pub mod report;
#[cfg(feature = "native")]
pub mod store;

// Re-export top-level types for convenience
pub use chart::{ChartLayout, DaYunMarker};
pub use error::{ClientError, ClientResult};
pub use forms::{FormError, LoginForm, ProfileForm};
pub use models::{
    AnalysisData, AnalysisDetail, AnalysisInput, AnalysisStatus, BasicProfileInput, BaziResult,
    Gender, KLinePoint, LifeDestinyResult, UserMeResponse,
};
pub use poll::{PollDecision, POLL_INTERVAL};
pub use routes::Route;
pub use session::{KeyValueStore, MemoryStore, Session};

#[cfg(feature = "native")]
pub use client::ApiClient;
#[cfg(feature = "native")]
pub use config::{Config, ConfigError};
#[cfg(feature = "native")]
pub use poll::{AnalysisSource, PollOutcome, Poller};
#[cfg(feature = "native")]
pub use store::FileStore;
