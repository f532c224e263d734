//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{parse_record_id, LoanField, LoanStatus, LoanView},
        LoanRecord,
    },
    services::{circulation::sort_records, BorrowOutcome, Library, LoanLocator, ReturnOutcome},
    AppState,
};

use super::{books::parse_order, commit, AuthenticatedUser, Claims};

/// Borrow request; administrators may borrow on behalf of a patron
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanRequest {
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    pub username: Option<String>,
}

/// `GET /loans` filters
#[derive(Debug, Default, Deserialize)]
pub struct LoanQuery {
    /// One of isbn, username, status, borrow_date, due_date
    pub field: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date {} (expected YYYY-MM-DD)", value)))
}

fn parse_loan_id(value: &str) -> AppResult<u64> {
    parse_record_id(value)
        .ok_or_else(|| AppError::Validation(format!("Invalid loan id: {}", value)))
}

/// Loans visible to the caller: everything for administrators, own loans otherwise
fn visible(library: &Library, claims: &Claims) -> Vec<LoanRecord> {
    if claims.is_admin() {
        library.circulation.records().to_vec()
    } else {
        library.circulation.by_patron(&claims.sub)
    }
}

/// Patrons may only touch their own loans
fn check_owner(library: &Library, claims: &Claims, id: u64) -> AppResult<()> {
    match library.circulation.find(id) {
        Some(record) => claims.require_self_or_admin(&record.username),
        // Let the desk report the missing record
        None => Ok(()),
    }
}

/// Borrow a book, or join its wait queue
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<BorrowOutcome>)> {
    request.validate()?;
    let username = request.username.unwrap_or_else(|| claims.sub.clone());
    claims.require_self_or_admin(&username)?;

    let outcome = commit(&state, |library| {
        library.borrow(&request.isbn, &username, Utc::now())
    })
    .await?;

    let status = match outcome {
        BorrowOutcome::Borrowed { .. } => StatusCode::CREATED,
        BorrowOutcome::Queued { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(outcome)))
}

pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ReturnOutcome>> {
    let id = parse_loan_id(&id)?;

    let outcome = commit(&state, |library| {
        check_owner(library, &claims, id)?;
        library.return_loan(&LoanLocator::Id(id), Utc::now())
    })
    .await?;
    Ok(Json(outcome))
}

pub async fn renew_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<LoanView>> {
    let id = parse_loan_id(&id)?;
    let now = Utc::now();

    let view = commit(&state, |library| {
        check_owner(library, &claims, id)?;
        Ok(library.renew(&LoanLocator::Id(id), now)?.view(now))
    })
    .await?;
    Ok(Json(view))
}

pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanView>>> {
    let now = Utc::now();
    let order = parse_order(query.order.as_deref())?;
    let sort: Option<LoanField> = query.sort.as_deref().map(str::parse::<LoanField>).transpose()?;

    let library = state.library.lock().await;
    let mut records = match (query.field.as_deref(), query.q.as_deref()) {
        (Some(field), Some(q)) if !q.trim().is_empty() => {
            let q = q.trim();
            let found = match field.parse::<LoanField>()? {
                LoanField::Isbn => library.circulation.by_book(q),
                LoanField::Username => library.circulation.by_patron(q),
                LoanField::Status => library.circulation.by_status(q.parse::<LoanStatus>()?, now),
                LoanField::BorrowDate => library.circulation.by_borrow_date(parse_date(q)?),
                LoanField::DueDate => library.circulation.by_due_date(parse_date(q)?),
                LoanField::Id => parse_loan_id(q)
                    .map(|id| library.circulation.find(id).cloned().into_iter().collect())?,
                LoanField::ReturnDate => {
                    return Err(AppError::Validation(
                        "Loans cannot be filtered by return date".to_string(),
                    ))
                }
            };
            if claims.is_admin() {
                found
            } else {
                found.into_iter().filter(|r| r.username == claims.sub).collect()
            }
        }
        _ => visible(&library, &claims),
    };
    drop(library);

    if let Some(field) = sort {
        sort_records(&mut records, field, order, now);
    }
    Ok(Json(records.iter().map(|r| r.view(now)).collect()))
}

pub async fn overdue_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanView>>> {
    let now = Utc::now();
    let library = state.library.lock().await;
    let views = library
        .circulation
        .overdue(now)
        .into_iter()
        .filter(|r| claims.is_admin() || r.username == claims.sub)
        .map(|r| r.view(now))
        .collect();
    Ok(Json(views))
}
