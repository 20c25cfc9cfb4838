use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Trainer {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewTrainer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}
