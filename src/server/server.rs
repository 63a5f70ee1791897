mod server_config;
mod error;
use server_config::AppConfig;
use error::ServerError;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router
};
use chrono::{Duration, Utc};
use log::info;
use serde::Deserialize;
use tower_http::catch_panic::CatchPanicLayer;

use teller::{
    Account, AccountId, Amount, Caller, Claims, CustomerId, Ledger, LedgerResult, Receipt,
    Transaction, TransactionId};

const SERVER_CONFIG: &str = "resources/server.toml";
const CONFIG_ENV: &str = "TELLER_CONFIG";
/// Set by the authenticating gateway in front of this service.
const CUSTOMER_HEADER: &str = "x-customer-id";
const SESSION_TTL_MINUTES: i64 = 15;

type AppState = Arc<Ledger>;

#[derive(Deserialize)]
struct CreateAccount {
    account_number: String,
    customer_id: CustomerId
}

#[derive(Deserialize)]
struct UpdateAccount {
    account_number: String
}

#[derive(Deserialize)]
struct Movement {
    amount: Amount
}

fn caller(headers: &HeaderMap) -> Result<Caller, ServerError> {
    let value = headers.get(CUSTOMER_HEADER)
        .ok_or_else(|| ServerError::Unauthenticated(format!("missing {} header", CUSTOMER_HEADER)))?;
    let customer_id = value.to_str().ok()
        .and_then(|raw| raw.trim().parse::<CustomerId>().ok())
        .ok_or_else(|| ServerError::Unauthenticated(format!("malformed {} header", CUSTOMER_HEADER)))?;

    let expires_at = Utc::now() + Duration::minutes(SESSION_TTL_MINUTES);
    Ok(Caller::Customer(Claims::new(customer_id, expires_at)))
}

/// Runs a ledger call off the async workers; ledger calls block on account
/// locks and snapshot writes.
async fn run<T, F>(ledger: AppState, call: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&Ledger) -> LedgerResult<T> + Send + 'static
{
    let result = tokio::task::spawn_blocking(move || call(&ledger)).await?;
    Ok(result?)
}

async fn create_account(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateAccount>
) -> Result<(StatusCode, Json<Account>), ServerError> {
    let caller = caller(&headers)?;
    let account = run(ledger, move |ledger| {
        ledger.create_account(&caller, &body.account_number, body.customer_id)
    }).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn get_account(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<AccountId>
) -> Result<Json<Account>, ServerError> {
    let caller = caller(&headers)?;
    Ok(Json(run(ledger, move |ledger| ledger.get_account(&caller, id)).await?))
}

async fn update_account(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<AccountId>,
    Json(body): Json<UpdateAccount>
) -> Result<Json<Account>, ServerError> {
    let caller = caller(&headers)?;
    let account = run(ledger, move |ledger| {
        ledger.update_account(&caller, id, &body.account_number)
    }).await?;
    Ok(Json(account))
}

async fn delete_account(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<AccountId>
) -> Result<StatusCode, ServerError> {
    let caller = caller(&headers)?;
    run(ledger, move |ledger| ledger.delete_account(&caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn deposit(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<AccountId>,
    Json(body): Json<Movement>
) -> Result<Json<Receipt>, ServerError> {
    let caller = caller(&headers)?;
    Ok(Json(run(ledger, move |ledger| ledger.deposit(&caller, id, body.amount)).await?))
}

async fn withdraw(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<AccountId>,
    Json(body): Json<Movement>
) -> Result<Json<Receipt>, ServerError> {
    let caller = caller(&headers)?;
    Ok(Json(run(ledger, move |ledger| ledger.withdraw(&caller, id, body.amount)).await?))
}

async fn transaction_history(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<AccountId>
) -> Result<Json<Vec<Transaction>>, ServerError> {
    let caller = caller(&headers)?;
    Ok(Json(run(ledger, move |ledger| ledger.transaction_history(&caller, id)).await?))
}

async fn get_transaction(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<TransactionId>
) -> Result<Json<Transaction>, ServerError> {
    let caller = caller(&headers)?;
    Ok(Json(run(ledger, move |ledger| ledger.get_transaction(&caller, id)).await?))
}

async fn customer_accounts(
    State(ledger): State<AppState>,
    headers: HeaderMap,
    Path(customer_id): Path<CustomerId>
) -> Result<Json<Vec<Account>>, ServerError> {
    let caller = caller(&headers)?;
    Ok(Json(run(ledger, move |ledger| ledger.list_accounts(&caller, customer_id)).await?))
}

fn router(ledger: AppState) -> Router {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/:id", get(get_account).put(update_account).delete(delete_account))
        .route("/accounts/:id/deposit", post(deposit))
        .route("/accounts/:id/withdraw", post(withdraw))
        .route("/accounts/:id/transactions", get(transaction_history))
        .route("/customers/:id/accounts", get(customer_accounts))
        .route("/transactions/:id", get(get_transaction))
        .layer(CatchPanicLayer::new())
        .with_state(ledger)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| SERVER_CONFIG.to_owned());
    let config = AppConfig::read(&config_path)
        .with_context(|| format!("failed to read app configuration from {}", config_path))?;

    config.storage.prepare()?;
    let ledger = Ledger::open_json(&config.storage)
        .with_context(|| "failed to load ledger snapshots")?;

    let listener = tokio::net::TcpListener::bind(&config.server.address).await
        .with_context(|| format!("failed to bind {}", config.server.address))?;
    info!("listening on {}", config.server.address);

    axum::serve(listener, router(Arc::new(ledger))).await?;
    Ok(())
}
