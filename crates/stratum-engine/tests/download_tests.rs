//! Download tests against a local HTTP server

mod fixtures;

use axum::extract::Query;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use stratum_core::{ErrorKind, RunState, Stage};
use stratum_engine::{DataIngestion, DownloadError, Downloader};

const DRIVE_LINK: &str = "https://drive.google.com/file/d/1insuranceFILE/view?usp=sharing";

async fn csv_body() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/csv")], fixtures::insurance_csv(100))
}

async fn empty_body() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/csv")], String::new())
}

/// Mimics the drive endpoint: an interstitial page first, the file once confirmed
async fn drive(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
    if params.get("id").map(String::as_str) != Some("1insuranceFILE") {
        return (axum::http::StatusCode::NOT_FOUND, "no such file").into_response();
    }
    match params.get("confirm").map(String::as_str) {
        Some("t0ken") => csv_body().await.into_response(),
        _ => Html(
            r#"<html><body>Google Drive can't scan this file for viruses.
<a href="/uc?export=download&amp;confirm=t0ken&amp;id=1insuranceFILE">Download anyway</a></body></html>"#,
        )
        .into_response(),
    }
}

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/datasets/insurance.csv", get(csv_body))
        .route("/datasets/empty.csv", get(empty_body))
        .route("/uc", get(drive));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_plain_url_uses_last_segment() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();

    let path = Downloader::new()
        .download(&format!("http://{}/datasets/insurance.csv", addr), dir.path())
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("insurance.csv"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), fixtures::insurance_csv(100));
}

#[tokio::test]
async fn test_not_found_is_status_error() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();

    let err = Downloader::new()
        .download(&format!("http://{}/datasets/missing.csv", addr), dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_empty_body_is_error() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();

    let err = Downloader::new()
        .download(&format!("http://{}/datasets/empty.csv", addr), dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::EmptyBody(_)));
}

#[tokio::test]
async fn test_drive_link_follows_confirm_token() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();

    let path = Downloader::new()
        .with_drive_endpoint(format!("http://{}/uc", addr))
        .download(DRIVE_LINK, &dir.path().join("raw"))
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("raw").join("insurance.csv"));
    assert!(std::fs::read_to_string(&path).unwrap().starts_with(fixtures::HEADER));
}

#[tokio::test]
async fn test_drive_link_unknown_file() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();

    let err = Downloader::new()
        .with_drive_endpoint(format!("http://{}/uc", addr))
        .download("https://drive.google.com/open?id=other", dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_ingestion_run_downloads_and_splits() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let config = fixtures::ingestion_config(dir.path(), &format!("http://{}/datasets/insurance.csv", addr));

    let mut ingestion = DataIngestion::new(config);
    let artifact = ingestion.run().await.unwrap();

    assert_eq!(artifact.train_rows, 80);
    assert_eq!(artifact.test_rows, 20);
    assert_eq!(
        ingestion.history(),
        &[
            RunState::Initialized,
            RunState::Running(Stage::Download),
            RunState::Running(Stage::Split),
            RunState::Completed,
        ]
    );
}

#[tokio::test]
async fn test_ingestion_run_fails_on_missing_dataset() {
    let addr = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let config = fixtures::ingestion_config(dir.path(), &format!("http://{}/datasets/gone.csv", addr));

    let mut ingestion = DataIngestion::new(config);
    let err = ingestion.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Download);
    assert_eq!(err.operation(), "download");
    assert_eq!(ingestion.state(), RunState::Failed(Stage::Download));
}
