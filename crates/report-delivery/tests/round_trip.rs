use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use report_core::{ReportPeriod, ReportRecord, ReportResult, UserId};
use report_delivery::{
    serve, DeliveryClient, DeliveryConfig, DeliveryError, ReportAcceptor, ReportSink,
};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

#[derive(Default)]
struct Collecting {
    received: Mutex<Vec<ReportResult>>,
}

#[async_trait]
impl ReportAcceptor for Collecting {
    async fn accept(&self, result: ReportResult) -> Result<(), String> {
        self.received.lock().await.push(result);
        Ok(())
    }
}

struct Refusing;

#[async_trait]
impl ReportAcceptor for Refusing {
    async fn accept(&self, _result: ReportResult) -> Result<(), String> {
        Err("chat unavailable".to_string())
    }
}

struct Slow;

#[async_trait]
impl ReportAcceptor for Slow {
    async fn accept(&self, _result: ReportResult) -> Result<(), String> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(())
    }
}

/// Start an acceptor on an ephemeral port. Dropping the sender stops it.
async fn start(acceptor: Arc<dyn ReportAcceptor>) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(serve(listener, acceptor, async {
        let _ = rx.await;
    }));

    (url, tx)
}

fn sample() -> ReportResult {
    ReportResult::success(
        UserId(11),
        ReportPeriod::Month,
        vec![
            ReportRecord {
                category: "Shopping".into(),
                amount: 1600.0,
            },
            ReportRecord {
                category: "Internet".into(),
                amount: 1000.0,
            },
        ],
        2600.0,
    )
}

#[tokio::test]
async fn delivered_report_reaches_acceptor() {
    let acceptor = Arc::new(Collecting::default());
    let (url, _stop) = start(acceptor.clone()).await;

    let client = DeliveryClient::new(DeliveryConfig::new(&url)).unwrap();
    assert!(client.health_check().await.unwrap());

    let ack = client.deliver(&sample()).await.unwrap();
    assert!(ack.success);

    let received = acceptor.received.lock().await;
    assert_eq!(received.as_slice(), &[sample()]);
}

#[tokio::test]
async fn failure_results_are_delivered_too() {
    let acceptor = Arc::new(Collecting::default());
    let (url, _stop) = start(acceptor.clone()).await;
    let client = DeliveryClient::new(DeliveryConfig::new(&url)).unwrap();

    let failed = ReportResult::failed(UserId(2), ReportPeriod::Week, "get rate: rate USD is not set yet");
    ReportSink::deliver(&client, &failed).await.unwrap();

    assert_eq!(acceptor.received.lock().await[0].error(), failed.error());
}

#[tokio::test]
async fn refusal_is_an_error() {
    let (url, _stop) = start(Arc::new(Refusing)).await;
    let client = DeliveryClient::new(DeliveryConfig::new(&url)).unwrap();

    let err = client.deliver(&sample()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Rejected(ref m) if m == "chat unavailable"));
}

#[tokio::test]
async fn slow_front_end_times_out() {
    let (url, _stop) = start(Arc::new(Slow)).await;
    let config = DeliveryConfig::new(&url).with_timeout(Duration::from_millis(200));
    let client = DeliveryClient::new(config).unwrap();

    let err = client.deliver(&sample()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn malformed_body_is_rejected_by_status() {
    let acceptor = Arc::new(Collecting::default());
    let (url, _stop) = start(acceptor.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{url}/reports"))
        .header("Content-Type", "application/json")
        .body(r#"{"user_id": 1, "period": "decade", "status": {"success": true}}"#)
        .send()
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert!(acceptor.received.lock().await.is_empty());
}

#[tokio::test]
async fn unreachable_front_end_is_an_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = DeliveryClient::new(DeliveryConfig::new(url)).unwrap();
    let err = client.deliver(&sample()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Http(_)));
}
