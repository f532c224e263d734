//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    collections::SortOrder,
    error::{AppError, AppResult},
    models::{Book, BookField, ImportReport},
    repository::legacy,
    AppState,
};

use super::{commit, AuthenticatedUser};

/// `GET /books` filters
#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    /// Field searched by `q` (default: title)
    pub field: Option<String>,
    pub q: Option<String>,
    /// Field to sort by; canonical order when absent
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// `GET /books/export` options
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub keys: legacy::LegacyKeys,
}

#[derive(Debug, Deserialize)]
pub struct YearRangeQuery {
    pub from: i32,
    pub to: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookRequest {
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "Publisher is required"))]
    pub publisher: String,
    pub publish_year: i32,
}

/// Single-field edit
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, message = "Field is required"))]
    pub field: String,
    pub value: String,
}

pub(crate) fn parse_order(order: Option<&str>) -> AppResult<SortOrder> {
    order
        .map(|o| o.parse::<SortOrder>().map_err(AppError::Validation))
        .transpose()
        .map(Option::unwrap_or_default)
}

pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let field: BookField = query.field.as_deref().unwrap_or("title").parse()?;
    let order = parse_order(query.order.as_deref())?;

    let library = state.library.lock().await;
    let catalog = &library.catalog;
    let results = catalog.search(field, query.q.as_deref().unwrap_or(""))?;
    let results = match query.sort.as_deref() {
        Some(sort) => catalog.sort_results(results, sort.parse()?, order),
        None => results,
    };
    Ok(Json(results))
}

pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let library = state.library.lock().await;
    Ok(Json(library.catalog.get(&isbn)?.clone()))
}

pub async fn books_by_years(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(range): Query<YearRangeQuery>,
) -> AppResult<Json<Vec<Book>>> {
    if range.from > range.to {
        return Err(AppError::Validation(format!(
            "Empty year range {}..={}",
            range.from, range.to
        )));
    }
    let library = state.library.lock().await;
    Ok(Json(library.catalog.find_by_year_range(range.from, range.to)))
}

pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;
    request.validate()?;

    let book = Book::new(
        request.isbn.trim(),
        request.title,
        request.author,
        request.publisher,
        request.publish_year,
    );
    commit(&state, |library| library.catalog.add(book.clone())).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
    Json(request): Json<UpdateBookRequest>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;
    request.validate()?;
    let field: BookField = request.field.parse()?;

    let book = commit(&state, |library| {
        library.catalog.update_field(&isbn, field, &request.value)?;
        Ok(library.catalog.get(&isbn)?.clone())
    })
    .await?;
    Ok(Json(book))
}

pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    commit(&state, |library| library.remove_book(&isbn)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bulk import of legacy flat-text lines sent as the request body
pub async fn import_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    body: String,
) -> AppResult<Json<ImportReport>> {
    claims.require_admin()?;

    let batch = legacy::parse(&body);
    let report = commit(&state, |library| Ok(library.import_legacy(batch))).await?;
    Ok(Json(report))
}

pub async fn export_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    claims.require_admin()?;

    let library = state.library.lock().await;
    let text = legacy::export(library.catalog.books(), query.keys);
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}
