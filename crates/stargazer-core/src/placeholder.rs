// Rows the list renders, and which placeholder stands in when there is no data
use crate::models::{Connectivity, Mode, RepositoryRecord, RequestStatus};

/// One renderable row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Data(DataRow),
    /// Spinner; either the whole list or the trailing "more to come" row
    Loading,
    Empty(EmptyKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow {
    pub record: RepositoryRecord,
    pub is_favorite: bool,
}

/// Why there is nothing to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyKind {
    /// The filter matched nothing
    NoResults,
    NoFavorites,
    /// The feed returned no repositories for the window
    NoRepositories,
    NetworkError,
    RequestFailed,
}

impl EmptyKind {
    pub fn title(&self) -> &'static str {
        match self {
            EmptyKind::NoResults => "No matching repositories",
            EmptyKind::NoFavorites => "No favorites yet",
            EmptyKind::NoRepositories => "No repositories found",
            EmptyKind::NetworkError => "No internet connection",
            EmptyKind::RequestFailed => "Something went wrong",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            EmptyKind::NoResults => "Try a different search term",
            EmptyKind::NoFavorites => "Star a repository to keep it here",
            EmptyKind::NoRepositories => "Try a longer time window",
            EmptyKind::NetworkError => "The list reloads once you are back online",
            EmptyKind::RequestFailed => "Pull to refresh to try again",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EmptyKind::NetworkError | EmptyKind::RequestFailed)
    }
}

impl Row {
    pub fn as_data(&self) -> Option<&DataRow> {
        match self {
            Row::Data(row) => Some(row),
            Row::Loading | Row::Empty(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        !matches!(self, Row::Data(_))
    }
}

/// Inputs the placeholder decision depends on
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderInput {
    pub status: RequestStatus,
    pub connectivity: Connectivity,
    /// Data rows that would be shown (after filtering)
    pub row_count: usize,
    /// Records loaded for the current mode, before filtering
    pub active_count: usize,
    pub mode: Mode,
    pub filtering: bool,
}

/// Pick the single placeholder shown in place of data, if any.
///
/// Precedence: network error > request failed > loading > empty. The network
/// error only applies to the remote feed and only before anything has loaded.
/// When loaded records are all hidden by the filter the answer is always
/// "no results"; failures with data are reported as notices instead.
pub fn placeholder_for(input: PlaceholderInput) -> Option<Row> {
    if input.row_count > 0 {
        return None;
    }
    if input.active_count > 0 {
        return Some(Row::Empty(EmptyKind::NoResults));
    }

    if input.mode == Mode::Browsing
        && input.connectivity == Connectivity::Offline
        && input.status != RequestStatus::Success
    {
        return Some(Row::Empty(EmptyKind::NetworkError));
    }

    let row = match input.status {
        RequestStatus::Failed => Row::Empty(EmptyKind::RequestFailed),
        RequestStatus::Loading => Row::Loading,
        RequestStatus::Success if input.filtering => Row::Empty(EmptyKind::NoResults),
        RequestStatus::Success => match input.mode {
            Mode::Favoriting => Row::Empty(EmptyKind::NoFavorites),
            Mode::Browsing => Row::Empty(EmptyKind::NoRepositories),
        },
    };

    Some(row)
}
