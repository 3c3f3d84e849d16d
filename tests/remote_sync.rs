//! The client against a real backend on a loopback port with an in-memory
//! database.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use eurl_books_client::models::{AnnualCharge, Client, Expense, ExpenseCategory, SettingsPatch, WorkDay};
use eurl_books_client::{finance, ApiError, AppStore, HttpBackend, Mutation, RemoteBackend, Table};
use eurl_books_lib::{AppState, ServerConfig};

struct TestServer {
    url: String,
    _shutdown: oneshot::Sender<()>,
    _receipts: TempDir,
}

async fn start_server() -> TestServer {
    let receipts = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        db_path: PathBuf::from(":memory:"),
        receipts_dir: receipts.path().to_path_buf(),
        pin_code: Some("1234".to_string()),
        ..ServerConfig::default()
    };
    let state = AppState::from_config(config).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let (shutdown, stop) = oneshot::channel::<()>();
    tokio::spawn(eurl_books_lib::serve(listener, state, async move {
        let _ = stop.await;
    }));

    TestServer {
        url,
        _shutdown: shutdown,
        _receipts: receipts,
    }
}

async fn logged_in(server: &TestServer) -> Arc<HttpBackend> {
    let backend = HttpBackend::new(server.url.clone());
    backend.login("1234").await.unwrap();
    Arc::new(backend)
}

#[tokio::test]
async fn test_requests_without_session_are_redirected() {
    let server = start_server().await;
    let backend = HttpBackend::new(server.url.clone());

    let err = backend.fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 307, .. }), "{:?}", err);
}

#[tokio::test]
async fn test_wrong_pin_is_rejected() {
    let server = start_server().await;
    let backend = HttpBackend::new(server.url.clone());

    let err = backend.login("0000").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 401,
            message: "Incorrect PIN".to_string(),
        }
    );
    assert_eq!(backend.session(), None);
}

#[tokio::test]
async fn test_store_actions_reach_the_backend() {
    let server = start_server().await;
    let backend = logged_in(&server).await;
    let store = AppStore::new(backend.clone());
    store.init().await.unwrap();
    assert_eq!(store.settings().social_contribution_rate, 45.0);

    store
        .add_client(Client {
            id: "TF1".to_string(),
            name: "TF1".to_string(),
            default_tjm: 650.0,
        })
        .unwrap();
    for date in ["2025-03-03", "2025-03-04", "2025-03-05"] {
        store.set_work_day(date, WorkDay::billed(date, "TF1", 650.0)).unwrap();
    }
    store.set_work_day("2025-03-06", WorkDay::not_worked("2025-03-06")).unwrap();
    store
        .add_expense(Expense {
            id: "e1".to_string(),
            date: "2025-03-10".to_string(),
            description: "Hotel Lyon".to_string(),
            amount_ht: 100.0,
            tva: 10.0,
            category: Some(ExpenseCategory::Lodging),
            client_name: Some("TF1".to_string()),
            receipt_url: None,
        })
        .unwrap();
    store
        .update_settings(SettingsPatch {
            social_contribution_rate: Some(50.0),
            ..Default::default()
        })
        .unwrap();
    store.set_salary("2025-03", 3000.0).unwrap();
    store.set_paid_revenue("2025-03", 1950.0).unwrap();
    store.set_one_off_revenue("2025-03", 400.0).unwrap();
    store
        .add_annual_charge(AnnualCharge {
            id: "a1".to_string(),
            label: "Expert-comptable".to_string(),
            amount_ht: 1200.0,
            year: 2025,
            document_url: None,
        })
        .unwrap();
    let last = store.remove_work_day("2025-03-05").unwrap();
    last.outcome().await.unwrap();
    let local = store.snapshot();
    store.dispose().await;

    let reloaded = AppStore::new(backend.clone());
    reloaded.init().await.unwrap();
    let remote = reloaded.snapshot();

    assert_eq!(remote, local);
    assert_eq!(remote.work_days.len(), 3);
    assert_eq!(finance::monthly_revenue(&remote, 2025, 3), 1300.0);
    assert_eq!(finance::not_worked_days(&remote, 2025, 3), 1);
    assert_eq!(remote.expenses[0].category, Some(ExpenseCategory::Lodging));
    assert_eq!(finance::net_income(3000.0, &remote.settings), 1170.0);
    assert_eq!(remote.one_off_revenues.get("2025-03"), Some(&400.0));
    reloaded.dispose().await;
}

#[tokio::test]
async fn test_repeated_upsert_leaves_rows_unchanged() {
    let server = start_server().await;
    let backend = logged_in(&server).await;

    let mutation = Mutation::upsert_work_day(&WorkDay::billed("2025-03-03", "TF1", 650.0));
    backend.apply_mutation(&mutation).await.unwrap();
    let first = backend.fetch_snapshot().await.unwrap();
    backend.apply_mutation(&mutation).await.unwrap();
    let second = backend.fetch_snapshot().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.work_days.len(), 1);
}

#[tokio::test]
async fn test_rejected_and_late_mutations() {
    let server = start_server().await;
    let backend = logged_in(&server).await;
    let store = AppStore::new(backend.clone());

    // Bypasses store validation to reach the server's checks
    let bad = Mutation::Upsert {
        table: Table::WorkDays,
        row: json!({"date": "2025-03-03", "tjm": -5.0})
            .as_object()
            .cloned()
            .unwrap(),
    };
    let err = backend.apply_mutation(&bad).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }), "{:?}", err);

    // A client row on a closed store never leaves the process
    store.dispose().await;
    let ticket = store
        .add_client(Client {
            id: "c1".to_string(),
            name: "Late".to_string(),
            default_tjm: 500.0,
        })
        .unwrap();
    assert_eq!(ticket.outcome().await, Err(ApiError::Closed));
    assert!(backend.fetch_snapshot().await.unwrap().clients.is_empty());
}
