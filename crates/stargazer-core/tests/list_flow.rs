use std::sync::Arc;
use std::time::Duration;

use stargazer_api::GitHubClient;
use stargazer_cache::KvStore;
use stargazer_core::{
    Completion, EmptyKind, Error, FavoritesSource, ListEngine, RemoteSource, Row, TimeWindow,
    DataSource,
};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn repo(id: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("tool-{}", id),
        "description": null,
        "language": "Rust",
        "stargazers_count": 500 - id,
        "forks_count": 1,
        "html_url": format!("https://github.com/octo/tool-{}", id),
        "created_at": "2024-05-01T10:00:00Z",
        "owner": { "login": "octo", "avatar_url": null }
    })
}

fn page_body(ids: std::ops::RangeInclusive<u64>, total: u32) -> serde_json::Value {
    serde_json::json!({
        "total_count": total,
        "incomplete_results": false,
        "items": ids.map(repo).collect::<Vec<_>>()
    })
}

fn remote_for(server: &MockServer) -> RemoteSource {
    RemoteSource::with_client(GitHubClient::with_base_url(
        None,
        server.uri(),
        Duration::from_millis(500),
    ))
}

async fn pump(engine: &mut ListEngine, rx: &mut UnboundedReceiver<Completion>, n: usize) {
    for _ in 0..n {
        let completion = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("completion arrived in time")
            .expect("completion channel open");
        engine.apply(completion);
    }
}

#[tokio::test]
async fn test_remote_source_clamps_total_to_search_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("sort", "stars"))
        .and(query_param("per_page", "10"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(11..=20, 48_000)))
        .mount(&server)
        .await;

    let page = remote_for(&server)
        .fetch(Some(TimeWindow::LastWeek), Some(2))
        .await
        .unwrap();

    assert_eq!(page.total_count, 1000);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].full_name(), "octo/tool-11");
}

#[tokio::test]
async fn test_remote_source_maps_bad_body_to_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = remote_for(&server).fetch(None, None).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn test_browse_favorite_and_switch_modes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1..=10, 12)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(11..=12, 12)))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(KvStore::open(&dir.path().join("favorites.db")).unwrap());
    let favorites = Arc::new(FavoritesSource::new(store));

    let (mut engine, mut rx) = ListEngine::new(
        Arc::new(remote_for(&server)),
        favorites.clone(),
        TimeWindow::LastDay,
    );

    engine.start();
    pump(&mut engine, &mut rx, 2).await;
    assert_eq!(engine.rows().len(), 11);
    assert_eq!(engine.rows().last(), Some(&Row::Loading));

    engine.load_more();
    pump(&mut engine, &mut rx, 1).await;
    assert_eq!(engine.working_set().len(), 12);
    assert!(!engine.has_more());

    let picked = engine.working_set()[11].clone();
    engine.toggle_favorite(&picked);
    pump(&mut engine, &mut rx, 1).await;
    assert!(engine.is_favorite(picked.id));

    // Persisted, not just held in memory
    assert_eq!(favorites.load().unwrap(), vec![picked.clone()]);

    engine.set_mode(true);
    pump(&mut engine, &mut rx, 2).await;
    assert_eq!(engine.rows().len(), 1);
    assert_eq!(engine.rows()[0].as_data().map(|d| d.record.id), Some(picked.id));

    engine.set_filter_text("zzz");
    assert_eq!(engine.rows(), &[Row::Empty(EmptyKind::NoResults)]);
}
