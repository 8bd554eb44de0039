//! The real HTTP stack against a fake accrual service served by axum on a
//! loopback port.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use loyalty_accrual::clients::{AccrualClient, AccrualError, AccrualService};
use loyalty_accrual::config::PipelineConfig;
use loyalty_accrual::dispatcher::{self, HttpTransport};
use loyalty_accrual::intake::OrderIntake;
use loyalty_accrual::lifecycle::{order_channel, shutdown, AccrualPipeline};
use loyalty_accrual::model::{OrderNumber, OrderStatus, UserId};
use loyalty_accrual::repository::LedgerActor;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Scripted answers per order number, consumed one per GET. The last answer
/// repeats once the script runs out.
#[derive(Clone, Default)]
struct FakeAccrual {
    registered: Arc<Mutex<HashSet<String>>>,
    scripts: Arc<Mutex<HashMap<String, Vec<(u16, Value)>>>>,
}

impl FakeAccrual {
    fn script(self, number: &str, answers: Vec<(u16, Value)>) -> Self {
        self.scripts.lock().unwrap().insert(number.to_string(), answers);
        self
    }
}

async fn register(State(fake): State<FakeAccrual>, Json(body): Json<Value>) -> Response {
    let Some(number) = body.get("order").and_then(Value::as_str) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if fake.registered.lock().unwrap().insert(number.to_string()) {
        StatusCode::ACCEPTED.into_response()
    } else {
        StatusCode::CONFLICT.into_response()
    }
}

async fn order_result(State(fake): State<FakeAccrual>, Path(number): Path<String>) -> Response {
    let mut scripts = fake.scripts.lock().unwrap();
    let Some(answers) = scripts.get_mut(&number) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let (status, body) = if answers.len() > 1 {
        answers.remove(0)
    } else {
        answers[0].clone()
    };
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

async fn serve(fake: FakeAccrual) -> String {
    let app = Router::new()
        .route("/api/orders", post(register))
        .route("/api/orders/{number}", get(order_result))
        .with_state(fake);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn accrual_client(base_url: &str, shutdown: loyalty_accrual::lifecycle::Shutdown) -> AccrualClient {
    let transport = HttpTransport::new(base_url, Duration::from_secs(2)).unwrap();
    let (actor, dispatch) = dispatcher::new(Arc::new(transport), Duration::from_millis(5), Duration::from_secs(2));
    tokio::spawn(actor.run(shutdown));
    AccrualClient::new(dispatch, Duration::from_millis(50))
}

#[tokio::test]
async fn client_speaks_the_accrual_protocol() {
    let fake = FakeAccrual::default()
        .script(
            "79927398713",
            vec![
                (200, json!({ "order": "79927398713", "status": "REGISTERED" })),
                (200, json!({ "order": "79927398713", "status": "PROCESSED", "accrual": 729.98 })),
            ],
        )
        .script(
            "18",
            vec![
                (429, json!({})),
                (200, json!({ "order": "18", "status": "INVALID" })),
            ],
        )
        .script("26", vec![(429, json!({}))]);
    let base_url = serve(fake).await;
    let (_trigger, signal) = shutdown::channel();
    let client = accrual_client(&base_url, signal.clone());

    let number = OrderNumber::from("79927398713");
    client.register_order(&signal, &number).await.unwrap();
    client.register_order(&signal, &number).await.unwrap();

    let first = client.fetch_accrual_result(&signal, &number).await.unwrap();
    assert_eq!(first.status, OrderStatus::New);
    let second = client.fetch_accrual_result(&signal, &number).await.unwrap();
    assert_eq!(second.status, OrderStatus::Processed);
    assert_eq!(second.accrual, 729.98);

    let throttled_once = client.fetch_accrual_result(&signal, &"18".into()).await.unwrap();
    assert_eq!(throttled_once.status, OrderStatus::Invalid);
    assert_eq!(throttled_once.accrual, 0.0);

    let err = client.fetch_accrual_result(&signal, &"26".into()).await.unwrap_err();
    assert_eq!(err, AccrualError::Throttled);

    let err = client.fetch_accrual_result(&signal, &"34".into()).await.unwrap_err();
    assert!(matches!(err, AccrualError::UnexpectedStatus { status: 204, .. }));
}

#[tokio::test]
async fn pipeline_converges_over_http() {
    let fake = FakeAccrual::default().script(
        "4561261212345467",
        vec![
            (200, json!({ "order": "4561261212345467", "status": "REGISTERED" })),
            (200, json!({ "order": "4561261212345467", "status": "PROCESSING" })),
            (200, json!({ "order": "4561261212345467", "status": "PROCESSED", "accrual": 500 })),
        ],
    );
    let base_url = serve(fake.clone()).await;

    let (ledger_actor, ledger) = LedgerActor::new(16);
    tokio::spawn(ledger_actor.run());

    let config = PipelineConfig {
        request_interval: Duration::from_millis(5),
        ..PipelineConfig::default()
    };
    let (sender, intake_rx) = order_channel(config.intake_capacity);
    let (dispatcher_trigger, dispatcher_signal) = shutdown::channel();
    let accrual = accrual_client(&base_url, dispatcher_signal);
    let pipeline = AccrualPipeline::start(&config, Arc::new(accrual), Arc::new(ledger.clone()), intake_rx)
        .await
        .unwrap();

    let intake = OrderIntake::new(ledger.clone(), sender);
    intake.submit(UserId(3), "4561261212345467").await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while ledger.balance(UserId(3)).await.unwrap().current == 0.0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("order never converged");

    pipeline.shutdown(intake.into_sender(), config.shutdown_timeout).await.unwrap();
    dispatcher_trigger.trigger();

    let order = ledger.order("4561261212345467".into()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processed);
    assert_eq!(order.accrual, 500.0);
    assert_eq!(ledger.balance(UserId(3)).await.unwrap().current, 500.0);
    assert!(fake.registered.lock().unwrap().contains("4561261212345467"));
}
