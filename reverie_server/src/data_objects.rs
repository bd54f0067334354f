use std::fmt::Display;

use reverie_common::ResourceVector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of `POST /api/market/{id}/offer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRequest {
    pub content: ResourceVector,
    pub rate: f64,
}

/// Query string of `GET /api/market`. `items` is a comma-separated list of category names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuery {
    pub items: String,
    #[serde(default)]
    pub page: i64,
}

impl MarketQuery {
    pub fn categories(&self) -> Vec<String> {
        self.items.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: i64,
}
