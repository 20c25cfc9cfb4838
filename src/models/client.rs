use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A trainer's customer. Every dependent record hangs off `id`.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i32,
    pub trainer_id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub trainer_id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Profile edit; `None` leaves the field untouched.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl ClientPatch {
    pub fn apply(self, client: &mut Client) {
        if let Some(name) = self.name {
            client.name = name;
        }
        if let Some(email) = self.email {
            client.email = Some(email);
        }
        if let Some(phone) = self.phone {
            client.phone = Some(phone);
        }
        if let Some(notes) = self.notes {
            client.notes = Some(notes);
        }
    }
}
