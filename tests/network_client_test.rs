use mockito::Server;
use scholar_flow::network::client::FastClient;
use scholar_flow::network::errors::NetworkError;
use scholar_flow::network::identity::IdentityProfile;
use std::time::Duration;

fn client() -> FastClient {
    FastClient::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_client_initialization() {
    assert!(FastClient::new(Duration::from_secs(30)).is_ok());
}

#[tokio::test]
async fn test_fetch_ok_sends_identity() {
    let mut server = Server::new_async().await;
    let profile = IdentityProfile::default();
    let mock = server
        .mock("GET", "/paper")
        .match_header("user-agent", profile.user_agent)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><head><title>A Paper</title></head><body>Text</body></html>")
        .create_async()
        .await;

    let body = client()
        .fetch(&format!("{}/paper", server.url()), &profile)
        .await
        .unwrap();

    assert!(body.contains("A Paper"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_forbidden_is_hard_ban() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/blocked").with_status(403).create_async().await;

    let err = client()
        .fetch(&format!("{}/blocked", server.url()), &IdentityProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NetworkError::HardBan(403)));
    assert!(err.is_access_denied());
}

#[tokio::test]
async fn test_rate_limited_is_hard_ban() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/busy").with_status(429).create_async().await;

    let err = client()
        .fetch(&format!("{}/busy", server.url()), &IdentityProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NetworkError::HardBan(429)));
}

#[tokio::test]
async fn test_challenge_page_is_soft_ban() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/challenge")
        .with_status(200)
        .with_body("<html><head><title>Just a moment...</title></head><body></body></html>")
        .create_async()
        .await;

    let err = client()
        .fetch(&format!("{}/challenge", server.url()), &IdentityProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NetworkError::SoftBan(_)));
}

#[tokio::test]
async fn test_server_error_is_status() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/broken").with_status(500).create_async().await;

    let err = client()
        .fetch(&format!("{}/broken", server.url()), &IdentityProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NetworkError::Status(500)));
    assert!(!err.is_access_denied());
}

#[tokio::test]
async fn test_empty_body_rejected() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/empty").with_status(200).with_body("  ").create_async().await;

    let err = client()
        .fetch(&format!("{}/empty", server.url()), &IdentityProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NetworkError::EmptyResponse));
}

#[tokio::test]
async fn test_fetch_bytes_enforces_limit() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/big.pdf")
        .with_status(200)
        .with_body(vec![b'x'; 2048])
        .create_async()
        .await;
    server
        .mock("GET", "/small.pdf")
        .with_status(200)
        .with_body("%PDF-1.4")
        .create_async()
        .await;

    let identity = IdentityProfile::default();
    let err = client()
        .fetch_bytes(&format!("{}/big.pdf", server.url()), &identity, 1024)
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::TooLarge { limit: 1024 }));

    let bytes = client()
        .fetch_bytes(&format!("{}/small.pdf", server.url()), &identity, 1024)
        .await
        .unwrap();
    assert_eq!(bytes, b"%PDF-1.4");
}

#[tokio::test]
async fn test_invalid_url() {
    let err = client()
        .fetch("not a url", &IdentityProfile::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::InvalidUrl(_)));
}
