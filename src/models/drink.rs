//! Drink model with its short and long projections.

use serde::{Deserialize, Serialize};

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 80;

/// One ingredient of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub color: String,
    pub name: String,
    pub parts: i64,
}

/// Ingredient as shown in the public listing, without its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: i64,
}

/// A drink on the menu. Serializes as the long projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Public view of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortDrink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

impl Drink {
    /// Short projection: ingredient names are dropped.
    pub fn short(&self) -> ShortDrink {
        ShortDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|i| ShortIngredient {
                    color: i.color.clone(),
                    parts: i.parts,
                })
                .collect(),
        }
    }

    /// Long projection: the full record.
    pub fn long(&self) -> Drink {
        self.clone()
    }
}

/// Recipe as accepted on the wire: a list, or a single ingredient object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

/// Parse a raw recipe value, normalizing a single object into a one-element list.
pub fn parse_recipe(value: serde_json::Value) -> Result<Vec<Ingredient>, String> {
    let recipe = match serde_json::from_value::<RecipeInput>(value) {
        Ok(RecipeInput::Many(items)) => items,
        Ok(RecipeInput::One(item)) => vec![item],
        Err(_) => {
            return Err(
                "Recipe must be an ingredient or a list of ingredients with color, name and parts"
                    .to_string(),
            )
        }
    };

    if recipe.is_empty() {
        return Err("Recipe must contain at least one ingredient".to_string());
    }
    Ok(recipe)
}

/// Check a title against the length rules.
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        ));
    }
    Ok(())
}

/// Validated fields for a new drink.
#[derive(Debug, Clone)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Validated partial update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct DrinkChanges {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

impl DrinkChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.recipe.is_none()
    }
}

/// Request body for creating a drink.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipe: Option<serde_json::Value>,
}

/// Request body for updating a drink.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipe: Option<serde_json::Value>,
}
