// List state engine
//
// Owns the working set, favorites, filter, window and paging cursor, and
// derives the rows the UI renders. Fetches run on Tokio tasks; their results
// come back as `Completion`s on a channel the host drains and feeds to
// `ListEngine::apply` from the same thread that calls every other method.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    models::{Connectivity, Mode, Page, RepositoryRecord, RequestStatus, TimeWindow},
    placeholder::{placeholder_for, DataRow, EmptyKind, PlaceholderInput, Row},
    source::DataSource,
    Error, Result,
};

/// Identifies the list session a page request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    mode: Mode,
    window: TimeWindow,
    page_no: u32,
}

/// Result of an asynchronous fetch, to be handed back to [`ListEngine::apply`]
#[derive(Debug)]
pub enum Completion {
    /// Primary fetch for the current mode
    Page { ticket: Ticket, result: Result<Page> },
    /// Full favorites set, after an optional write. Higher `seq` wins.
    Favorites { seq: u64, result: Result<Page> },
}

/// Transient message for the UI, shown without replacing rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RequestFailed(String),
    Offline,
    ConnectionRestored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    RowsChanged,
    Notice(Notice),
}

/// Receives engine events; register with [`ListEngine::subscribe`]
pub trait ListObserver: Send + Sync {
    fn notify(&self, event: &ListEvent);
}

enum FavoritesCommand {
    Refresh { seq: u64 },
    Add { record: RepositoryRecord, seq: u64 },
    Remove { record: RepositoryRecord, seq: u64 },
    Page { ticket: Ticket },
}

#[derive(Debug, Default)]
struct EngineState {
    mode: Mode,
    page: u32,
    working_set: Vec<RepositoryRecord>,
    favorites: Vec<RepositoryRecord>,
    favorite_ids: HashSet<u64>,
    filter_text: Option<String>,
    time_window: TimeWindow,
    request_status: RequestStatus,
    has_more: bool,
    filtered_set: Vec<RepositoryRecord>,
    rows: Vec<Row>,
}

pub struct ListEngine {
    remote: Arc<dyn DataSource>,
    favorites_tx: mpsc::UnboundedSender<FavoritesCommand>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    state: EngineState,
    connectivity: Connectivity,
    /// Bumped on every reset; pages from older generations are dropped
    generation: u64,
    browse_in_flight: bool,
    favorites_seq: u64,
    favorites_applied: u64,
    /// Membership a toggle asked for, until a favorites snapshot at least that new lands
    pending_favorites: HashMap<u64, (bool, u64)>,
    observers: Vec<Arc<dyn ListObserver>>,
}

impl ListEngine {
    /// Build an engine in browsing mode showing a single loading row.
    ///
    /// Nothing is fetched until [`ListEngine::start`]. Must be called inside a
    /// Tokio runtime: favorites reads and writes run on a dedicated task so
    /// they complete in the order they were issued.
    pub fn new(
        remote: Arc<dyn DataSource>,
        favorites: Arc<dyn DataSource>,
        window: TimeWindow,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let favorites_tx = spawn_favorites_worker(favorites, completions_tx.clone());

        let state = EngineState {
            time_window: window,
            has_more: true,
            rows: vec![Row::Loading],
            ..EngineState::default()
        };

        let engine = Self {
            remote,
            favorites_tx,
            completions_tx,
            state,
            connectivity: Connectivity::Online,
            generation: 0,
            browse_in_flight: false,
            favorites_seq: 0,
            favorites_applied: 0,
            pending_favorites: HashMap::new(),
            observers: Vec::new(),
        };

        (engine, completions_rx)
    }

    pub fn subscribe(&mut self, observer: Arc<dyn ListObserver>) {
        self.observers.push(observer);
    }

    /// Kick off the first load of the session
    pub fn start(&mut self) {
        self.reset();
    }

    // ---- accessors -------------------------------------------------------

    pub fn rows(&self) -> &[Row] {
        &self.state.rows
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn page(&self) -> u32 {
        self.state.page
    }

    pub fn working_set(&self) -> &[RepositoryRecord] {
        &self.state.working_set
    }

    pub fn favorites(&self) -> &[RepositoryRecord] {
        &self.state.favorites
    }

    pub fn filtered_set(&self) -> &[RepositoryRecord] {
        &self.state.filtered_set
    }

    pub fn filter_text(&self) -> Option<&str> {
        self.state.filter_text.as_deref()
    }

    pub fn time_window(&self) -> TimeWindow {
        self.state.time_window
    }

    pub fn request_status(&self) -> RequestStatus {
        self.state.request_status
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn is_favorite(&self, id: u64) -> bool {
        self.state.favorite_ids.contains(&id)
    }

    pub fn is_filtering(&self) -> bool {
        self.state.filter_text.is_some()
    }

    /// Pull-to-refresh only makes sense for the remote feed
    pub fn pull_to_refresh_enabled(&self) -> bool {
        self.state.mode == Mode::Browsing
    }

    pub fn has_data_rows(&self) -> bool {
        self.state.rows.iter().any(|row| !row.is_placeholder())
    }

    /// Records loaded for the current mode, whether or not the filter shows them
    fn active_set(&self) -> &[RepositoryRecord] {
        match self.state.mode {
            Mode::Browsing => &self.state.working_set,
            Mode::Favoriting => &self.state.favorites,
        }
    }

    fn has_active_data(&self) -> bool {
        !self.active_set().is_empty()
    }

    fn showing_network_error(&self) -> bool {
        matches!(
            self.state.rows.as_slice(),
            [Row::Empty(EmptyKind::NetworkError)]
        )
    }

    // ---- operations ------------------------------------------------------

    /// Fetch the next page of the remote feed
    pub fn load_more(&mut self) {
        if self.state.mode == Mode::Favoriting {
            return;
        }
        if self.state.request_status == RequestStatus::Loading || self.browse_in_flight {
            debug!("load_more ignored, a page request is already pending");
            return;
        }
        if !self.state.has_more {
            debug!("load_more ignored, feed exhausted at page {}", self.state.page);
            return;
        }

        self.state.request_status = RequestStatus::Loading;
        self.recompute();
        self.request_primary();
    }

    /// Drop the working set and load everything for the current mode again
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state.page = 0;
        self.state.working_set.clear();
        self.state.filtered_set.clear();
        self.state.has_more = true;
        self.state.request_status = RequestStatus::Loading;
        self.browse_in_flight = false;

        debug!(
            "Reset list (generation {}, {:?}, {})",
            self.generation, self.state.mode, self.state.time_window
        );

        self.recompute();
        self.refresh_favorites();
        self.request_primary();
    }

    /// Pull-to-refresh; ignored while favoriting
    pub fn refresh(&mut self) {
        if !self.pull_to_refresh_enabled() {
            debug!("Refresh ignored in favorites mode");
            return;
        }
        self.reset();
    }

    pub fn set_mode(&mut self, favoriting: bool) {
        let mode = if favoriting {
            Mode::Favoriting
        } else {
            Mode::Browsing
        };
        if mode == self.state.mode {
            return;
        }

        info!("Switching list mode to {:?}", mode);
        self.state.mode = mode;
        self.reset();
    }

    pub fn set_time_window(&mut self, window: TimeWindow) {
        if window == self.state.time_window {
            return;
        }

        info!("Time window set to {}", window);
        self.state.time_window = window;
        if self.state.mode == Mode::Browsing {
            self.reset();
        }
    }

    /// Narrow the visible rows by name. Never touches the network.
    pub fn set_filter_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.state.filter_text = if text.is_empty() { None } else { Some(text) };
        self.recompute();
    }

    /// Add the record to favorites if it isn't one, remove it otherwise
    pub fn toggle_favorite(&mut self, record: &RepositoryRecord) {
        let currently = self
            .pending_favorites
            .get(&record.id)
            .map(|(wanted, _)| *wanted)
            .unwrap_or_else(|| self.is_favorite(record.id));

        let seq = self.next_favorites_seq();
        self.pending_favorites.insert(record.id, (!currently, seq));

        let command = if currently {
            FavoritesCommand::Remove {
                record: record.clone(),
                seq,
            }
        } else {
            FavoritesCommand::Add {
                record: record.clone(),
                seq,
            }
        };
        self.send_favorites(command);
    }

    /// Reachability changed
    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        if connectivity == self.connectivity {
            return;
        }
        self.connectivity = connectivity;

        match connectivity {
            Connectivity::Offline => {
                info!("Connection lost");
                // Lets the next scroll retry once whatever is in flight gives up
                if self.state.request_status == RequestStatus::Loading {
                    self.state.request_status = RequestStatus::Failed;
                }

                let had_data = self.has_active_data();
                self.recompute();
                if had_data {
                    self.emit(ListEvent::Notice(Notice::Offline));
                }
            }
            Connectivity::Online => {
                if self.showing_network_error() {
                    info!("Connection restored, reloading");
                    self.reset();
                } else {
                    info!("Connection restored");
                    self.emit(ListEvent::Notice(Notice::ConnectionRestored));
                }
            }
        }
    }

    /// Fold a finished fetch into the state
    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Page { ticket, result } => self.apply_page(ticket, result),
            Completion::Favorites { seq, result } => self.apply_favorites(seq, result),
        }
    }

    // ---- internals -------------------------------------------------------

    fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
            && ticket.mode == self.state.mode
            && (ticket.mode == Mode::Favoriting || ticket.window == self.state.time_window)
    }

    fn apply_page(&mut self, ticket: Ticket, result: Result<Page>) {
        if !self.is_current(&ticket) {
            debug!(
                "Discarding stale page {} from generation {}",
                ticket.page_no, ticket.generation
            );
            return;
        }

        if ticket.mode == Mode::Browsing {
            self.browse_in_flight = false;
        }

        match result {
            Ok(page) => {
                match ticket.mode {
                    Mode::Browsing => self.append_page(ticket.page_no, page),
                    Mode::Favoriting => {
                        self.set_favorites(page.items);
                        self.state.has_more = false;
                    }
                }
                self.state.request_status = RequestStatus::Success;
                self.recompute();
            }
            Err(err) if ticket.mode == Mode::Favoriting => {
                // An unreadable store counts as no favorites
                warn!("Reading favorites failed, showing none: {}", err);
                self.set_favorites(Vec::new());
                self.state.has_more = false;
                self.state.request_status = RequestStatus::Success;
                self.recompute();
            }
            Err(err) => self.handle_failure(err),
        }
    }

    fn append_page(&mut self, page_no: u32, page: Page) {
        let received = page.items.len();
        let mut seen: HashSet<u64> = self.state.working_set.iter().map(|r| r.id).collect();
        let before = self.state.working_set.len();

        for record in page.items {
            if seen.insert(record.id) {
                self.state.working_set.push(record);
            }
        }

        let added = self.state.working_set.len() - before;
        if added < received {
            debug!(
                "Dropped {} duplicate repositories from page {}",
                received - added,
                page_no
            );
        }

        self.state.page += 1;
        // An empty page ends pagination even if the count says otherwise
        self.state.has_more =
            received > 0 && (self.state.working_set.len() as u64) < u64::from(page.total_count);
    }

    fn handle_failure(&mut self, err: Error) {
        warn!("Fetching repositories failed: {}", err);

        if self.connectivity == Connectivity::Offline {
            // Rows stay as they are; the reconnect handler decides what to reload
            if self.state.request_status == RequestStatus::Loading {
                self.state.request_status = RequestStatus::Failed;
            }
            self.recompute();
            return;
        }

        let had_data = self.has_active_data();
        self.state.request_status = RequestStatus::Failed;
        self.recompute();

        if had_data {
            self.emit(ListEvent::Notice(Notice::RequestFailed(err.to_string())));
        }
    }

    fn apply_favorites(&mut self, seq: u64, result: Result<Page>) {
        if seq <= self.favorites_applied {
            debug!("Discarding superseded favorites snapshot {}", seq);
            return;
        }

        match result {
            Ok(page) => {
                self.favorites_applied = seq;
                self.pending_favorites
                    .retain(|_, (_, requested_at)| *requested_at > seq);
                self.set_favorites(page.items);
                self.recompute();
            }
            Err(err) => warn!("Reading favorites failed: {}", err),
        }
    }

    fn set_favorites(&mut self, favorites: Vec<RepositoryRecord>) {
        self.state.favorite_ids = favorites.iter().map(|r| r.id).collect();
        self.state.favorites = favorites;
    }

    fn next_favorites_seq(&mut self) -> u64 {
        self.favorites_seq += 1;
        self.favorites_seq
    }

    fn refresh_favorites(&mut self) {
        let seq = self.next_favorites_seq();
        self.send_favorites(FavoritesCommand::Refresh { seq });
    }

    fn send_favorites(&self, command: FavoritesCommand) {
        if self.favorites_tx.send(command).is_err() {
            warn!("Favorites worker has stopped");
        }
    }

    fn request_primary(&mut self) {
        let ticket = Ticket {
            generation: self.generation,
            mode: self.state.mode,
            window: self.state.time_window,
            page_no: self.state.page + 1,
        };

        match ticket.mode {
            Mode::Browsing if self.connectivity == Connectivity::Offline => {
                // No point asking the network; the reconnect handler reloads
                debug!("Offline, page {} not requested", ticket.page_no);
                let _ = self.completions_tx.send(Completion::Page {
                    ticket,
                    result: Err(Error::Offline),
                });
            }
            Mode::Browsing => {
                self.browse_in_flight = true;
                let remote = Arc::clone(&self.remote);
                let tx = self.completions_tx.clone();

                tokio::spawn(async move {
                    let result = remote.fetch(Some(ticket.window), Some(ticket.page_no)).await;
                    let _ = tx.send(Completion::Page { ticket, result });
                });
            }
            Mode::Favoriting => self.send_favorites(FavoritesCommand::Page { ticket }),
        }
    }

    /// Rebuild the filtered set and rows from the current state
    fn recompute(&mut self) {
        let active = self.active_set();

        let filtered = match &self.state.filter_text {
            Some(text) => {
                let needle = text.to_lowercase();
                active
                    .iter()
                    .filter(|r| r.matches_filter(&needle))
                    .cloned()
                    .collect()
            }
            None => active.to_vec(),
        };
        self.state.filtered_set = filtered;

        let rows = self.derive_rows();
        if rows != self.state.rows {
            self.state.rows = rows;
            self.emit(ListEvent::RowsChanged);
        }
    }

    fn derive_rows(&self) -> Vec<Row> {
        let filtering = self.is_filtering();
        let placeholder = placeholder_for(PlaceholderInput {
            status: self.state.request_status,
            connectivity: self.connectivity,
            row_count: self.state.filtered_set.len(),
            active_count: self.active_set().len(),
            mode: self.state.mode,
            filtering,
        });
        if let Some(row) = placeholder {
            return vec![row];
        }

        let mut rows: Vec<Row> = self
            .state
            .filtered_set
            .iter()
            .map(|record| {
                Row::Data(DataRow {
                    record: record.clone(),
                    is_favorite: self.is_favorite(record.id),
                })
            })
            .collect();

        if self.state.mode == Mode::Browsing && self.state.has_more && !filtering {
            rows.push(Row::Loading);
        }

        rows
    }

    fn emit(&self, event: ListEvent) {
        for observer in &self.observers {
            observer.notify(&event);
        }
    }
}

/// Runs favorites reads and writes one at a time, in issue order
fn spawn_favorites_worker(
    source: Arc<dyn DataSource>,
    completions: mpsc::UnboundedSender<Completion>,
) -> mpsc::UnboundedSender<FavoritesCommand> {
    let (tx, mut rx) = mpsc::unbounded_channel::<FavoritesCommand>();

    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            let completion = match command {
                FavoritesCommand::Refresh { seq } => Completion::Favorites {
                    seq,
                    result: source.fetch(None, None).await,
                },
                FavoritesCommand::Add { record, seq } => {
                    if let Err(e) = source.add(&record).await {
                        warn!("Could not add {} to favorites: {}", record.full_name(), e);
                    }
                    Completion::Favorites {
                        seq,
                        result: source.fetch(None, None).await,
                    }
                }
                FavoritesCommand::Remove { record, seq } => {
                    if let Err(e) = source.remove(&record).await {
                        warn!("Could not remove {} from favorites: {}", record.full_name(), e);
                    }
                    Completion::Favorites {
                        seq,
                        result: source.fetch(None, None).await,
                    }
                }
                FavoritesCommand::Page { ticket } => Completion::Page {
                    ticket,
                    result: source.fetch(None, None).await,
                },
            };

            if completions.send(completion).is_err() {
                break;
            }
        }
    });

    tx
}
