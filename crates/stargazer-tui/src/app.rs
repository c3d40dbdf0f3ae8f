// TUI application state and event handling
use ratatui::widgets::ListState;
use stargazer_api::Reachability;
use stargazer_core::{
    Connectivity, ListEngine, ListEvent, ListObserver, Mode, Notice, RepositoryRecord, Row,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long a status message stays in the status bar
const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,    // Navigating the list
    Filtering, // Typing in the filter box
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    shown_at: Instant,
}

/// Collects engine events so the draw loop can pick them up
#[derive(Default)]
struct EventInbox {
    events: Mutex<Vec<ListEvent>>,
}

impl EventInbox {
    fn take(&self) -> Vec<ListEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }
}

impl ListObserver for EventInbox {
    fn notify(&self, event: &ListEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

pub struct App {
    pub engine: ListEngine,
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub filter_input: String,
    pub list_state: ListState,
    pub status_message: Option<StatusMessage>,
    /// Written by the renderer: is the trailing loading row on screen
    pub loader_in_view: bool,
    loader_was_in_view: bool,
    inbox: Arc<EventInbox>,
}

impl App {
    pub fn new(mut engine: ListEngine) -> Self {
        let inbox = Arc::new(EventInbox::default());
        engine.subscribe(inbox.clone());

        Self {
            engine,
            should_quit: false,
            input_mode: InputMode::Normal,
            filter_input: String::new(),
            list_state: ListState::default(),
            status_message: None,
            loader_in_view: false,
            loader_was_in_view: false,
            inbox,
        }
    }

    pub fn start(&mut self) {
        self.engine.start();
        self.sync_selection();
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Handle everything the engine reported since the last call
    pub fn process_events(&mut self) {
        for event in self.inbox.take() {
            match event {
                ListEvent::RowsChanged => {
                    // A fresh list counts as a new appearance of the loader
                    self.loader_was_in_view = false;
                    self.sync_selection();
                }
                ListEvent::Notice(notice) => self.show_notice(notice),
            }
        }
    }

    /// Ask for the next page when the trailing loader scrolls into view
    pub fn after_draw(&mut self) {
        if self.loader_in_view && !self.loader_was_in_view {
            debug!("Trailing loader visible, requesting next page");
            self.engine.load_more();
        }
        self.loader_was_in_view = self.loader_in_view;
    }

    fn show_notice(&mut self, notice: Notice) {
        match notice {
            Notice::RequestFailed(reason) => {
                self.set_status(format!("Couldn't load more: {}", reason), true)
            }
            Notice::Offline => self.set_status("You are offline", true),
            Notice::ConnectionRestored => self.set_status("Back online", false),
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            is_error,
            shown_at: Instant::now(),
        });
    }

    /// Status message, if it hasn't expired yet
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status_message
            .as_ref()
            .filter(|m| m.shown_at.elapsed() < STATUS_TTL)
    }

    pub fn set_reachability(&mut self, reachability: Reachability) {
        let connectivity = match reachability {
            Reachability::Reachable => Connectivity::Online,
            Reachability::Unreachable => Connectivity::Offline,
        };
        self.engine.set_connectivity(connectivity);
        self.process_events();
    }

    // ---- selection -------------------------------------------------------

    /// Keep the selection on a data row that still exists
    fn sync_selection(&mut self) {
        let data_rows = self.data_row_count();
        if data_rows == 0 {
            self.list_state.select(None);
            return;
        }

        let selected = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(selected.min(data_rows - 1)));
    }

    fn data_row_count(&self) -> usize {
        self.engine
            .rows()
            .iter()
            .filter(|row| !row.is_placeholder())
            .count()
    }

    pub fn next(&mut self) {
        let data_rows = self.data_row_count();
        if data_rows == 0 {
            return;
        }

        let next = self.list_state.selected().map_or(0, |i| i + 1);
        if next >= data_rows {
            // Scrolling past the last row asks for more
            if self.engine.rows().last() == Some(&Row::Loading) {
                self.engine.load_more();
            }
            self.list_state.select(Some(data_rows - 1));
        } else {
            self.list_state.select(Some(next));
        }
    }

    pub fn previous(&mut self) {
        if let Some(i) = self.list_state.selected() {
            self.list_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn first(&mut self) {
        if self.data_row_count() > 0 {
            self.list_state.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        let data_rows = self.data_row_count();
        if data_rows > 0 {
            self.list_state.select(Some(data_rows - 1));
        }
    }

    pub fn selected_record(&self) -> Option<&RepositoryRecord> {
        let index = self.list_state.selected()?;
        self.engine
            .rows()
            .get(index)
            .and_then(Row::as_data)
            .map(|row| &row.record)
    }

    fn reset_selection(&mut self) {
        self.list_state = ListState::default();
        self.loader_was_in_view = false;
        self.sync_selection();
    }

    // ---- filter ----------------------------------------------------------

    pub fn enter_filter_mode(&mut self) {
        self.input_mode = InputMode::Filtering;
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_input.push(c);
        self.engine.set_filter_text(self.filter_input.clone());
        self.reset_selection();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_input.pop();
        self.engine.set_filter_text(self.filter_input.clone());
        self.reset_selection();
    }

    /// Keep the filter and go back to the list
    pub fn confirm_filter(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn clear_filter(&mut self) {
        self.filter_input.clear();
        self.engine.set_filter_text(String::new());
        self.input_mode = InputMode::Normal;
        self.reset_selection();
    }

    // ---- list actions ----------------------------------------------------

    pub fn toggle_selected_favorite(&mut self) {
        let Some(record) = self.selected_record().cloned() else {
            return;
        };

        let adding = !self.engine.is_favorite(record.id);
        self.engine.toggle_favorite(&record);
        if adding {
            self.set_status(format!("★ Added {} to favorites", record.full_name()), false);
        } else {
            self.set_status(format!("Removed {} from favorites", record.full_name()), false);
        }
    }

    pub fn toggle_favorites_view(&mut self) {
        let favoriting = self.engine.mode() == Mode::Browsing;
        self.engine.set_mode(favoriting);
        self.reset_selection();
    }

    pub fn cycle_time_window(&mut self) {
        let window = self.engine.time_window().next();
        self.engine.set_time_window(window);
        self.reset_selection();
        if self.engine.mode() == Mode::Favoriting {
            self.set_status(format!("Trending will show {}", window.title()), false);
        }
    }

    pub fn refresh(&mut self) {
        if !self.engine.pull_to_refresh_enabled() {
            self.set_status("Favorites are always up to date", false);
            return;
        }
        self.engine.refresh();
        self.reset_selection();
    }

    pub fn open_selected(&mut self) {
        let Some(url) = self.selected_record().map(|r| r.url_path.clone()) else {
            return;
        };

        if let Err(e) = open::that(&url) {
            warn!("Failed to open {}: {}", url, e);
            self.set_status(format!("Failed to open browser: {}", e), true);
        }
    }

    pub fn copy_selected_url(&mut self) {
        let Some(url) = self.selected_record().map(|r| r.url_path.clone()) else {
            return;
        };

        let copied = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(url.clone()));
        match copied {
            Ok(()) => self.set_status(format!("Copied {}", url), false),
            Err(e) => {
                warn!("Clipboard unavailable: {}", e);
                self.set_status(format!("Failed to copy: {}", e), true);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use stargazer_cache::KvStore;
    use stargazer_core::{
        Completion, DataSource, FavoritesSource, Owner, Page, TimeWindow,
    };
    use tokio::sync::mpsc::UnboundedReceiver;

    pub(crate) fn record(id: u64) -> RepositoryRecord {
        RepositoryRecord {
            id,
            name: format!("crate-{}", id),
            description: Some(format!("Crate number {}", id)),
            language: Some("Rust".to_string()),
            star_count: 1200,
            fork_count: 30,
            url_path: format!("https://github.com/octo/crate-{}", id),
            created_at: Utc::now(),
            owner: Owner {
                name: "octo".to_string(),
                avatar_url: None,
            },
        }
    }

    /// Serves ids 1..=total, ten per page
    pub(crate) struct FakeFeed {
        pub total: u32,
    }

    #[async_trait]
    impl DataSource for FakeFeed {
        async fn fetch(
            &self,
            _window: Option<TimeWindow>,
            page_no: Option<u32>,
        ) -> stargazer_core::Result<Page> {
            let page_no = page_no.unwrap_or(1).max(1);
            let start = (page_no - 1) * 10;
            let end = (start + 10).min(self.total);
            Ok(Page {
                total_count: self.total,
                items: (start..end).map(|i| record(u64::from(i) + 1)).collect(),
            })
        }
    }

    pub(crate) fn test_app(total: u32) -> (App, UnboundedReceiver<Completion>) {
        let favorites = Arc::new(FavoritesSource::new(Arc::new(KvStore::in_memory().unwrap())));
        let (engine, rx) = ListEngine::new(Arc::new(FakeFeed { total }), favorites, TimeWindow::LastDay);
        (App::new(engine), rx)
    }

    pub(crate) async fn pump(app: &mut App, rx: &mut UnboundedReceiver<Completion>, n: usize) {
        for _ in 0..n {
            let completion = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("completion arrived in time")
                .expect("completion channel open");
            app.engine.apply(completion);
        }
        app.process_events();
    }

    #[tokio::test]
    async fn test_selection_follows_first_page() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        assert_eq!(app.list_state.selected(), None);

        pump(&mut app, &mut rx, 2).await;
        assert_eq!(app.list_state.selected(), Some(0));
        assert_eq!(app.selected_record().map(|r| r.id), Some(1));
    }

    #[tokio::test]
    async fn test_loader_coming_into_view_loads_once() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        pump(&mut app, &mut rx, 2).await;

        app.loader_in_view = true;
        app.after_draw();
        app.after_draw();
        pump(&mut app, &mut rx, 1).await;
        assert_eq!(app.engine.page(), 2);

        // New rows arrived, loader is still on screen: next page
        app.after_draw();
        pump(&mut app, &mut rx, 1).await;
        assert_eq!(app.engine.page(), 3);
        assert!(!app.engine.has_more());
    }

    #[tokio::test]
    async fn test_scrolling_past_last_row_loads_more() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        pump(&mut app, &mut rx, 2).await;

        app.last();
        app.next();
        assert_eq!(app.list_state.selected(), Some(9));
        pump(&mut app, &mut rx, 1).await;
        assert_eq!(app.engine.page(), 2);

        app.next();
        assert_eq!(app.list_state.selected(), Some(10));
    }

    #[tokio::test]
    async fn test_filter_typing_narrows_rows() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        pump(&mut app, &mut rx, 2).await;

        app.enter_filter_mode();
        for c in "crate-1".chars() {
            app.push_filter_char(c);
        }
        // crate-1 and crate-10
        assert_eq!(app.engine.rows().len(), 2);

        app.clear_filter();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.engine.filter_text().is_none());
        assert_eq!(app.engine.rows().len(), 11);
    }

    #[tokio::test]
    async fn test_toggle_favorite_sets_status() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        pump(&mut app, &mut rx, 2).await;

        app.toggle_selected_favorite();
        pump(&mut app, &mut rx, 1).await;
        assert!(app.engine.is_favorite(1));
        assert!(app.status().is_some_and(|m| m.text.contains("octo/crate-1")));
    }

    #[tokio::test]
    async fn test_refresh_in_favorites_view_is_refused() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        pump(&mut app, &mut rx, 2).await;

        app.toggle_favorites_view();
        pump(&mut app, &mut rx, 2).await;
        app.refresh();

        assert_eq!(app.engine.mode(), Mode::Favoriting);
        assert!(app.status().is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unreachable_with_rows_shows_offline_status() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        pump(&mut app, &mut rx, 2).await;

        app.set_reachability(Reachability::Unreachable);
        let status = app.status().unwrap();
        assert!(status.is_error);
        assert_eq!(status.text, "You are offline");

        app.set_reachability(Reachability::Reachable);
        assert_eq!(app.status().unwrap().text, "Back online");
    }
}
