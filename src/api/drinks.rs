//! Drink API endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};

use super::{ApiResult, DeleteResponse, DrinksResponse};
use crate::auth::Claims;
use crate::errors::AppError;
use crate::models::{
    parse_recipe, validate_title, CreateDrinkRequest, Drink, DrinkChanges, NewDrink, ShortDrink,
    UpdateDrinkRequest,
};
use crate::AppState;

/// Non-integer ids name no drink.
fn drink_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    id.map(|Path(id)| id)
        .map_err(|e| AppError::NotFound(format!("Invalid drink id: {}", e.body_text())))
}

/// Store faults while creating or deleting are reported as unprocessable.
fn unprocessable_store_fault(err: AppError) -> AppError {
    match err {
        AppError::Database(msg) => AppError::Validation(msg),
        other => other,
    }
}

async fn all_drinks(state: &AppState) -> Result<Vec<Drink>, AppError> {
    let drinks = state.repo.list_drinks().await?;
    if drinks.is_empty() {
        return Err(AppError::NotFound("The menu has no drinks".to_string()));
    }
    Ok(drinks)
}

/// GET /drinks - Public listing, short projection.
pub async fn list_drinks(State(state): State<AppState>) -> ApiResult<DrinksResponse<ShortDrink>> {
    let drinks = all_drinks(&state).await?;
    Ok(DrinksResponse::new(drinks.iter().map(Drink::short).collect()))
}

/// GET /drinks-detail - Full recipes, long projection.
pub async fn list_drinks_detail(
    State(state): State<AppState>,
) -> ApiResult<DrinksResponse<Drink>> {
    let drinks = all_drinks(&state).await?;
    Ok(DrinksResponse::new(drinks.iter().map(Drink::long).collect()))
}

/// POST /drinks - Create a new drink.
pub async fn create_drink(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> ApiResult<DrinksResponse<Drink>> {
    let Json(request) = payload.map_err(|e| match e {
        JsonRejection::JsonDataError(_) => AppError::Validation(e.body_text()),
        _ => AppError::BadRequest(e.body_text()),
    })?;

    // Validate required fields
    let title = request
        .title
        .ok_or_else(|| AppError::Validation("Title is required".to_string()))?;
    validate_title(&title).map_err(AppError::Validation)?;

    let recipe = request
        .recipe
        .ok_or_else(|| AppError::Validation("Recipe is required".to_string()))?;
    let recipe = parse_recipe(recipe).map_err(AppError::Validation)?;

    // The unique constraint still catches concurrent inserts.
    let existing = state
        .repo
        .find_drink_by_title(&title)
        .await
        .map_err(unprocessable_store_fault)?;
    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "A drink titled '{}' already exists",
            title
        )));
    }

    let drink = state
        .repo
        .create_drink(&NewDrink { title, recipe })
        .await
        .map_err(unprocessable_store_fault)?;
    tracing::info!("{} added drink {}", claims.subject(), drink.id);

    Ok(DrinksResponse::new(vec![drink.long()]))
}

/// PATCH /drinks/:id - Update the supplied fields of a drink.
pub async fn update_drink(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> ApiResult<DrinksResponse<Drink>> {
    let id = drink_id(id)?;
    state
        .repo
        .get_drink(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Drink {} not found", id)))?;

    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut changes = DrinkChanges::default();
    if let Some(title) = request.title {
        validate_title(&title).map_err(AppError::BadRequest)?;
        changes.title = Some(title);
    }
    if let Some(recipe) = request.recipe {
        changes.recipe = Some(parse_recipe(recipe).map_err(AppError::BadRequest)?);
    }

    let drink = state.repo.update_drink(id, &changes).await?;
    tracing::info!("{} updated drink {}", claims.subject(), id);

    Ok(DrinksResponse::new(vec![drink.long()]))
}

/// DELETE /drinks/:id - Delete a drink.
pub async fn delete_drink(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeleteResponse> {
    let id = drink_id(id)?;

    state
        .repo
        .delete_drink(id)
        .await
        .map_err(unprocessable_store_fault)?;
    tracing::info!("{} deleted drink {}", claims.subject(), id);

    Ok(DeleteResponse {
        success: true,
        delete: id,
    })
}
