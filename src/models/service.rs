use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price: f64,
    pub active: bool,
}
