use std::time::Duration;

use irlog_lib::{
    remote::{RemoteClient, RemoteError},
    signal::Signal,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{body_string_contains, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn client_for(server: &MockServer) -> RemoteClient {
    RemoteClient::new(format!("{}/1/messages", server.uri()), "secret").unwrap()
}

#[tokio::test]
async fn fetch_decodes_pending_signal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/messages"))
        .and(query_param("clientkey", "secret"))
        .and(query_param("clear", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "format": "raw", "freq": 38, "data": [18031, 8755, 1190] },
            "hostname": "IRKitD2A4",
            "deviceid": "FBEC7F5148274DADB608799D43175FD1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let envelope = client
        .fetch_pending(CancellationToken::new())
        .await
        .unwrap()
        .expect("signal pending");

    assert_eq!(envelope.message.data, vec![18031, 8755, 1190]);
    assert_eq!(envelope.message.format, "raw");
    assert_eq!(envelope.hostname, "IRKitD2A4");
    assert_eq!(envelope.deviceid, "FBEC7F5148274DADB608799D43175FD1");
}

#[tokio::test]
async fn empty_body_means_nothing_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/messages"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let pending = client.fetch_pending(CancellationToken::new()).await.unwrap();
    assert!(pending.is_none());
}

#[tokio::test]
async fn non_200_is_an_error_with_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .fetch_pending(CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RemoteError::Status(status) => assert_eq!(status, "401 Unauthorized"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .fetch_pending(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn cancel_abandons_a_hanging_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let cancel = CancellationToken::new();
    let request = tokio::spawn({
        let cancel = cancel.clone();
        async move { client.fetch_pending(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .expect("cancelled fetch resolves promptly")
        .unwrap();
    assert!(matches!(outcome, Err(RemoteError::Cancelled)));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let client = RemoteClient::new("http://127.0.0.1:9/1/messages", "secret").unwrap();
    let err = client
        .fetch_pending(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn replay_posts_form_with_json_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/messages"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("clientkey=secret"))
        .and(body_string_contains("deviceid=dev-1"))
        .and(body_string_contains(
            "message=%7B%22format%22%3A%22raw%22%2C%22freq%22%3A38%2C%22data%22%3A%5B1%2C2%2C3%5D%7D",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let signal = Signal {
        format: "raw".into(),
        freq: 38,
        data: vec![1, 2, 3],
    };
    client.replay("dev-1", &signal).await.unwrap();
}

#[tokio::test]
async fn replay_rejection_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let signal = Signal {
        format: "raw".into(),
        freq: 38,
        data: vec![1],
    };
    let err = client.replay("dev-1", &signal).await.unwrap_err();
    assert_eq!(err.to_string(), "remote service responded with 400 Bad Request");
}
