//! End-to-end tests for the scoring service.

use futures::StreamExt;
use scorestream::element::PushHandle;
use scorestream::error::Error;
use scorestream::pipeline::StreamOutcome;
use scorestream::scoring::{
    ColumnAssembler, LinearModel, Link, Record, Score, ScoringService, ServiceConfig,
};
use scorestream::transport::response_channel;
use std::thread;

fn churn_service(config: ServiceConfig) -> ScoringService {
    let features = ColumnAssembler::new(["tenure", "tickets"])
        .standardize("tenure", 12.0, 6.0)
        .unwrap();
    let model = LinearModel::new(vec![-1.0, 0.5], 0.0)
        .with_link(Link::Logistic)
        .with_name("churn");
    ScoringService::with_config(model, features, config).unwrap()
}

fn customer(id: &str, tenure: f64, tickets: f64) -> Record {
    Record::new(id).with("tenure", tenure).with("tickets", tickets)
}

#[tokio::test]
async fn test_scores_in_arrival_order() {
    let service = churn_service(ServiceConfig::default());
    let records = vec![
        customer("c1", 12.0, 0.0),
        customer("c2", 0.0, 4.0),
        customer("c3", 24.0, 0.0),
    ];

    let scores: Vec<Score> = service
        .score_stream(records)
        .map(|s| s.unwrap())
        .collect()
        .await;

    let ids: Vec<&str> = scores.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert!((scores[0].value - 0.5).abs() < 1e-6);
    assert!(scores[1].value > 0.9);
    assert!(scores[2].value < 0.2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transport_thread_feeds_call() {
    let service = churn_service(ServiceConfig::default());
    let (tx, responses) = response_channel();
    let call = service.open_call(tx);

    let input = call.input().clone();
    let transport = thread::spawn(move || {
        for i in 0..100 {
            input.deliver(customer(&format!("c{i}"), i as f64, 1.0));
        }
        input.finish();
    });

    let scores: Vec<_> = responses.collect().await;
    transport.join().unwrap();

    assert_eq!(scores.len(), 100);
    assert!(scores.iter().all(|s| s.is_ok()));
    let stats = call.wait().await.unwrap();
    assert_eq!(stats.outcome, StreamOutcome::Completed);
    assert_eq!(stats.elements, 100);
}

#[tokio::test]
async fn test_cancelled_call_reports_cancellation() {
    let service = churn_service(ServiceConfig::default());
    let (tx, mut responses) = response_channel();
    let mut call = service.open_call(tx);

    call.input().deliver(customer("c1", 1.0, 1.0));
    assert!(responses.next_item().await.unwrap().is_ok());

    call.cancel();
    assert_eq!(responses.next_item().await, Some(Err(Error::Cancelled)));

    let input = call.input().clone();
    let stats = call.wait().await.unwrap();
    assert_eq!(stats.outcome, StreamOutcome::Cancelled);
    assert!(input.is_cancelled());
}

#[tokio::test]
async fn test_suppressed_completion_leaves_response_open() {
    let service = churn_service(ServiceConfig::default().close_on_complete(false));
    let (tx, mut responses) = response_channel();
    let call = service.open_call(tx.clone());

    call.input().deliver(customer("c1", 1.0, 1.0));
    call.input().finish();
    call.wait().await.unwrap();

    assert!(responses.next_item().await.unwrap().is_ok());
    assert!(!tx.is_closed());
    tx.finish();
    assert_eq!(responses.next_item().await, None);
}

#[tokio::test]
async fn test_overflow_surfaces_to_client() {
    let service = churn_service(ServiceConfig::default().with_capacity(1));
    let (tx, responses) = response_channel();
    let call = service.open_call(tx);

    // Nothing is served before the task first runs, so the second element
    // overflows the queue.
    call.input().deliver(customer("c1", 1.0, 1.0));
    call.input().deliver(customer("c2", 1.0, 1.0));

    let out: Vec<_> = responses.collect().await;
    assert_eq!(out.len(), 2);
    assert!(out[0].is_ok());
    assert_eq!(out[1], Err(Error::Overflow { capacity: 1 }));
    assert!(matches!(
        call.wait().await.unwrap().outcome,
        StreamOutcome::Failed(Error::Overflow { .. })
    ));
}

#[tokio::test]
async fn test_call_ids_increment() {
    let service = churn_service(ServiceConfig::default());
    let first = service.open_call(response_channel::<Score>().0);
    let second = service.open_call(response_channel::<Score>().0);

    assert_eq!(first.id(), 0);
    assert_eq!(second.id(), 1);
    assert_eq!(service.calls_opened(), 2);
}
