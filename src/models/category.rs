use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{is_hex_color, Errors, FieldError, Validate};

pub const DEFAULT_COLOR: &str = "#3182CE";
pub const DEFAULT_ICON: &str = "FiDollarSign";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a category joined into expenses and budget allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub icon: String,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            color: category.color.clone(),
            icon: category.icon.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl Validate for CategoryRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Errors::new();
        errors.length("name", &self.name, 1, 30);
        if let Some(description) = &self.description {
            errors.length("description", description, 0, 200);
        }
        if let Some(color) = &self.color {
            errors.check(
                is_hex_color(color.trim()),
                "color",
                "Color must be a valid hex color",
            );
        }
        errors.finish()
    }
}

/// Normalised category fields ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
}

impl From<CategoryRequest> for NewCategory {
    fn from(request: CategoryRequest) -> Self {
        Self {
            name: request.name.trim().to_string(),
            description: request
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            color: request
                .color
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            icon: request
                .icon
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| DEFAULT_ICON.to_string()),
        }
    }
}
