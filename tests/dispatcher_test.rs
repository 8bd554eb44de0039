use loyalty_accrual::clients::{AccrualClient, AccrualService};
use loyalty_accrual::dispatcher::{self, DispatchError, OutboundRequest, OutboundResponse};
use loyalty_accrual::lifecycle::shutdown;
use loyalty_accrual::mock::RecordingTransport;
use loyalty_accrual::model::OrderNumber;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_millis(250);

/// K concurrent callers, one gate: consecutive calls start at least one
/// interval apart no matter how the callers race.
#[tokio::test(start_paused = true)]
async fn concurrent_dispatches_are_spaced_by_the_interval() {
    let transport = RecordingTransport::new().with_delay(Duration::from_secs(1));
    let (actor, client) = dispatcher::new(Arc::new(transport.clone()), INTERVAL, Duration::from_secs(30));
    let (trigger, signal) = shutdown::channel();
    tokio::spawn(actor.run(signal.clone()));

    let mut handles = Vec::new();
    for i in 0..6 {
        let client = client.clone();
        let signal = signal.clone();
        handles.push(tokio::spawn(async move {
            client
                .dispatch(&signal, OutboundRequest::get(format!("/api/orders/{i}")))
                .await
        }));
    }
    for handle in handles {
        let response = handle.await.unwrap().expect("dispatch failed");
        assert_eq!(response.status, StatusCode::OK);
    }

    let calls = transport.calls();
    assert_eq!(calls.len(), 6);
    for pair in calls.windows(2) {
        let gap = pair[1].at - pair[0].at;
        assert!(gap >= INTERVAL, "calls only {gap:?} apart");
    }
    trigger.trigger();
}

/// The 1s transport delay must not hold the gate: the sixth call starts
/// five intervals after the first, not five seconds.
#[tokio::test(start_paused = true)]
async fn slow_calls_do_not_delay_the_next_release() {
    let transport = RecordingTransport::new().with_delay(Duration::from_secs(1));
    let (actor, client) = dispatcher::new(Arc::new(transport.clone()), INTERVAL, Duration::from_secs(30));
    let (_trigger, signal) = shutdown::channel();
    tokio::spawn(actor.run(signal.clone()));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let client = client.clone();
        let signal = signal.clone();
        handles.push(tokio::spawn(async move {
            client.dispatch(&signal, OutboundRequest::get("/api/orders/18")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let calls = transport.calls();
    let span = calls[5].at - calls[0].at;
    assert!(span < INTERVAL * 6, "span was {span:?}");
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_waiting_callers() {
    let transport = RecordingTransport::new();
    let (actor, client) = dispatcher::new(Arc::new(transport.clone()), Duration::from_secs(10), Duration::from_secs(60));
    let (trigger, signal) = shutdown::channel();
    tokio::spawn(actor.run(signal.clone()));

    client
        .dispatch(&signal, OutboundRequest::get("/api/orders/18"))
        .await
        .unwrap();

    let waiting = {
        let client = client.clone();
        let signal = signal.clone();
        tokio::spawn(async move { client.dispatch(&signal, OutboundRequest::get("/api/orders/26")).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    trigger.trigger();

    assert_eq!(waiting.await.unwrap(), Err(DispatchError::Cancelled));
    assert_eq!(transport.calls().len(), 1);
}

/// Two registrations of the same order: 202 then 409, both success.
#[tokio::test(start_paused = true)]
async fn repeated_registration_is_not_an_error() {
    let transport = RecordingTransport::new()
        .with_response(OutboundResponse::new(StatusCode::ACCEPTED, ""))
        .with_response(OutboundResponse::new(StatusCode::CONFLICT, "already registered"));
    let (actor, dispatch) = dispatcher::new(Arc::new(transport.clone()), INTERVAL, Duration::from_secs(5));
    let (_trigger, signal) = shutdown::channel();
    tokio::spawn(actor.run(signal.clone()));

    let client = AccrualClient::new(dispatch, Duration::from_secs(60));
    let number = OrderNumber::from("79927398713");
    client.register_order(&signal, &number).await.unwrap();
    client.register_order(&signal, &number).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.request.path == "/api/orders"));
}

/// The sixth caller queues for five intervals, far longer than the response
/// timeout, and still gets its answer.
#[tokio::test(start_paused = true)]
async fn queue_wait_does_not_count_against_the_timeout() {
    let transport = RecordingTransport::new();
    let (actor, client) = dispatcher::new(
        Arc::new(transport.clone()),
        Duration::from_secs(1),
        Duration::from_millis(500),
    );
    let (_trigger, signal) = shutdown::channel();
    tokio::spawn(actor.run(signal.clone()));

    let mut handles = Vec::new();
    for i in 0..6 {
        let client = client.clone();
        let signal = signal.clone();
        handles.push(tokio::spawn(async move {
            client
                .dispatch(&signal, OutboundRequest::get(format!("/api/orders/{i}")))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(transport.calls().len(), 6);
}

/// Once released, a call that takes longer than the timeout still fails.
#[tokio::test(start_paused = true)]
async fn slow_released_call_times_out() {
    let transport = RecordingTransport::new().with_delay(Duration::from_secs(2));
    let (actor, client) = dispatcher::new(
        Arc::new(transport.clone()),
        Duration::from_millis(100),
        Duration::from_secs(1),
    );
    let (_trigger, signal) = shutdown::channel();
    tokio::spawn(actor.run(signal.clone()));

    let result = client
        .dispatch(&signal, OutboundRequest::get("/api/orders/18"))
        .await;
    assert_eq!(result, Err(DispatchError::Timeout(Duration::from_secs(1))));
}
