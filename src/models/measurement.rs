use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: i32,
    pub client_id: i32,
    pub measured_on: NaiveDate,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub note: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewMeasurement {
    pub client_id: i32,
    pub measured_on: NaiveDate,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub note: Option<String>,
}
