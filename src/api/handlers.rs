use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::application::AppError;
use crate::domain::{AccountId, cents_to_units, format_cents};
use crate::rates::RateInfo;

use super::AppState;
use super::dto::{
    AccountView, CreateAccountBody, MoneyBody, SummaryView, TransferBody, UpdateAccountBody,
};

type ApiResult<T> = Result<T, AppError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Non-numeric IDs can't name an account, so they are reported as not found.
fn parse_id(raw: &str) -> ApiResult<AccountId> {
    raw.parse()
        .map_err(|_| AppError::AccountNotFound(raw.to_string()))
}

pub async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Banking Management System API!" }))
}

pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AccountView>)> {
    let request = body(payload)?.into_request()?;
    let account = state.ledger.create_account(request).await?;
    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Json<Vec<AccountView>>> {
    let accounts = state.ledger.list_accounts().await?;
    Ok(Json(accounts.iter().map(AccountView::from).collect()))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccountView>> {
    let account = state.ledger.get_account(parse_id(&id)?).await?;
    Ok(Json(AccountView::from(&account)))
}

pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAccountBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    let changes = body(payload)?.into_changes()?;
    let account = state.ledger.update_account(id, changes).await?;
    Ok(Json(json!({
        "message": "Account updated successfully",
        "account": AccountView::from(&account),
    })))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.ledger.delete_account(parse_id(&id)?).await?;
    Ok(Json(json!({ "message": "Account deleted successfully" })))
}

pub async fn deposit(
    State(state): State<AppState>,
    payload: Result<Json<MoneyBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let (number, amount) = body(payload)?.into_parts()?;
    let account = state.ledger.deposit(&number, amount).await?;
    Ok(Json(json!({
        "message": format!("Deposited {} successfully", format_cents(amount)),
        "balance": cents_to_units(account.balance),
    })))
}

pub async fn withdraw(
    State(state): State<AppState>,
    payload: Result<Json<MoneyBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let (number, amount) = body(payload)?.into_parts()?;
    let account = state.ledger.withdraw(&number, amount).await?;
    Ok(Json(json!({
        "message": format!("Withdrawn {} successfully", format_cents(amount)),
        "balance": cents_to_units(account.balance),
    })))
}

pub async fn transfer(
    State(state): State<AppState>,
    payload: Result<Json<TransferBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let (sender, receiver, amount) = body(payload)?.into_parts()?;
    let result = state.ledger.transfer(&sender, &receiver, amount).await?;
    Ok(Json(json!({
        "message": format!(
            "Transferred {} from {} to {} successfully",
            format_cents(amount),
            result.sender.number,
            result.receiver.number
        ),
        "sender_balance": cents_to_units(result.sender.balance),
        "receiver_balance": cents_to_units(result.receiver.balance),
    })))
}

pub async fn batch_calc(State(state): State<AppState>) -> ApiResult<Json<SummaryView>> {
    let summary = state.aggregation.compute_summary().await?;
    Ok(Json(SummaryView::from(summary)))
}

pub async fn interest_rates(State(state): State<AppState>) -> Json<Vec<RateInfo>> {
    Json(state.scraper.scrape_interest_rates().await)
}

pub async fn bank_names(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.scraper.scrape_bank_names().await)
}
