use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use tally_api::app::services::AppServices;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory ledger, bound to an ephemeral port.
        let app = tally_api::app::build_app(AppServices::in_memory());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn open_account(&self, balance: &str) -> String {
        let res = self
            .client
            .post(self.url("/accounts"))
            .json(&json!({ "balance": balance }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    async fn balance(&self, id: &str) -> Decimal {
        let res = self
            .client
            .get(self.url(&format!("/accounts/{id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        decimal(&body["balance"])
    }

    async fn transfer(&self, from: &str, to: &str, amount: &str) -> reqwest::Response {
        self.client
            .post(self.url("/transfers"))
            .json(&json!({ "fromAccount": from, "toAccount": to, "amount": amount }))
            .send()
            .await
            .unwrap()
    }

    async fn ledger(&self, id: &str) -> Vec<Value> {
        let res = self
            .client
            .get(self.url(&format!("/accounts/{id}/transfers")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn decimal(v: &Value) -> Decimal {
    v.as_str()
        .expect("decimals are serialized as strings")
        .parse()
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn simple_transfer_moves_funds() {
    let srv = TestServer::spawn().await;
    let a = srv.open_account("100.00").await;
    let b = srv.open_account("0.00").await;

    let res = srv.transfer(&a, &b, "30.00").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let debit: Value = res.json().await.unwrap();
    assert_eq!(debit["aggregateId"].as_str().unwrap(), a);
    assert_eq!(debit["fromAccount"].as_str().unwrap(), a);
    assert_eq!(debit["toAccount"].as_str().unwrap(), b);
    assert_eq!(decimal(&debit["amount"]), Decimal::new(-3000, 2));
    assert!(debit["timestamp"].is_string());

    assert_eq!(srv.balance(&a).await, Decimal::new(7000, 2));
    assert_eq!(srv.balance(&b).await, Decimal::new(3000, 2));

    let ledger = srv.ledger(&a).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(decimal(&ledger[0]["amount"]), Decimal::new(-3000, 2));

    let credits = srv.ledger(&b).await;
    assert_eq!(credits.len(), 1);
    assert_eq!(decimal(&credits[0]["amount"]), Decimal::new(3000, 2));
    assert_eq!(credits[0]["timestamp"], ledger[0]["timestamp"]);
}

#[tokio::test]
async fn overdraft_is_rejected() {
    let srv = TestServer::spawn().await;
    let a = srv.open_account("10.00").await;
    let b = srv.open_account("0").await;

    let res = srv.transfer(&a, &b, "50.00").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_funds");
    assert!(body["message"].as_str().unwrap().contains(&a));

    assert_eq!(srv.balance(&a).await, Decimal::new(1000, 2));
    assert!(srv.ledger(&a).await.is_empty());
    assert!(srv.ledger(&b).await.is_empty());
}

#[tokio::test]
async fn concurrent_debits_allow_exactly_one() {
    let srv = TestServer::spawn().await;
    let source = srv.open_account("100").await;
    let x = srv.open_account("0").await;
    let y = srv.open_account("0").await;

    let (first, second) = tokio::join!(
        srv.transfer(&source, &x, "60"),
        srv.transfer(&source, &y, "60"),
    );
    let mut statuses = vec![first.status(), second.status()];
    statuses.sort();

    assert_eq!(
        statuses,
        vec![StatusCode::CREATED, StatusCode::UNPROCESSABLE_ENTITY]
    );
    assert_eq!(srv.balance(&source).await, Decimal::new(40, 0));
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let srv = TestServer::spawn().await;
    let a = srv.open_account("100").await;
    let ghost = "0192a6f2-7c1e-7d43-9a51-3f0c2b1d4e5f";

    let res = srv.transfer(&a, ghost, "10").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "one of the accounts does not exist");
    assert!(srv.ledger(&a).await.is_empty());

    let res = srv
        .client
        .get(srv.url(&format!("/accounts/{ghost}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(srv.ledger(ghost).await.is_empty());
}

#[tokio::test]
async fn invalid_input_is_bad_request() {
    let srv = TestServer::spawn().await;
    let a = srv.open_account("100").await;
    let b = srv.open_account("0").await;

    for balance in ["-1", "1000000000000000", "79228162514264337593543950335"] {
        let res = srv
            .client
            .post(srv.url("/accounts"))
            .json(&json!({ "balance": balance }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "balance {balance}");
    }

    for amount in ["0", "-5", "1.00001", "1000000000000000"] {
        let res = srv.transfer(&a, &b, amount).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "amount {amount}");
    }
    assert_eq!(srv.transfer(&a, &a, "1").await.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/transfers"))
        .json(&json!({ "fromAccount": a }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .get(srv.url("/accounts/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(srv.balance(&a).await, Decimal::new(100, 0));
}
