// Data source implementations
pub mod favorites;
pub mod remote;

pub use favorites::FavoritesSource;
pub use remote::RemoteSource;
