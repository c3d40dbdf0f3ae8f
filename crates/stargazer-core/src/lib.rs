// Core list logic - data model, data sources, placeholder policy and the list engine
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod placeholder;
pub mod providers;
pub mod source;

pub use config::Config;
pub use engine::{Completion, ListEngine, ListEvent, ListObserver, Notice};
pub use error::Error;
pub use models::{Connectivity, Mode, Owner, Page, RepositoryRecord, RequestStatus, TimeWindow};
pub use placeholder::{DataRow, EmptyKind, Row};
pub use providers::{FavoritesSource, RemoteSource};
pub use source::DataSource;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
