use crate::{
    models::{Page, RepositoryRecord, TimeWindow},
    Result,
};

/// Common fetch contract for everything that can feed the list
///
/// The remote feed pages through search results; the favorites store returns
/// its whole set in one page and ignores both arguments. Only the favorites
/// store supports writes; the defaults here are no-ops.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, window: Option<TimeWindow>, page_no: Option<u32>) -> Result<Page>;

    async fn add(&self, _record: &RepositoryRecord) -> Result<()> {
        Ok(())
    }

    async fn remove(&self, _record: &RepositoryRecord) -> Result<()> {
        Ok(())
    }
}
