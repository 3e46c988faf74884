
use std::time::Duration;

use market::{FeedApi, FeedClient, FeedError};

#[tokio::test]
async fn fetches_and_maps_quote() {
    let server = mock_http::respond_once(
        200,
        r#"{"data":[{"price":"487,900,000","high":"488,000,000","low":"487,000,000"}]}"#,
    )
    .await;
    let client = FeedClient::new().unwrap();

    let quote = client.fetch_quote(&server.url).await.unwrap();

    assert_eq!(quote.price, 487_900_000.0);
    assert_eq!(quote.high, Some(488_000_000.0));
    assert_eq!(quote.low, Some(487_000_000.0));

    let raw = server.request.await.unwrap();
    assert!(raw.starts_with("GET / HTTP/1.1"));
}

#[tokio::test]
async fn non_2xx_status_is_total_failure() {
    // A well-formed body must still be discarded on error status.
    let server = mock_http::respond_once(503, r#"{"price": 1}"#).await;
    let client = FeedClient::new().unwrap();

    let err = client.fetch_quote(&server.url).await.unwrap_err();

    assert!(matches!(err, FeedError::Http(ref e) if e.is_status()));
}

#[tokio::test]
async fn malformed_json_is_failure() {
    let server = mock_http::respond_once(200, "<html>oops</html>").await;
    let client = FeedClient::new().unwrap();

    let err = client.fetch_quote(&server.url).await.unwrap_err();

    assert!(matches!(err, FeedError::Decode(_)));
}

#[tokio::test]
async fn payload_without_price_is_failure() {
    let server = mock_http::respond_once(200, r#"{"data":[]}"#).await;
    let client = FeedClient::new().unwrap();

    let err = client.fetch_quote(&server.url).await.unwrap_err();

    assert!(matches!(err, FeedError::MissingPrice));
}

#[tokio::test]
async fn slow_feed_times_out() {
    let server = mock_http::stall(Duration::from_secs(5)).await;
    let client = FeedClient::with_timeout(Duration::from_millis(200)).unwrap();

    let err = client.fetch_quote(&server.url).await.unwrap_err();

    assert!(matches!(err, FeedError::Http(ref e) if e.is_timeout()));
    server.request.abort();
}
