use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i32,
    pub client_id: i32,
    pub title: String,
    pub target_date: Option<NaiveDate>,
    pub achieved: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub client_id: i32,
    pub title: String,
    pub target_date: Option<NaiveDate>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    pub title: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub achieved: Option<bool>,
}

impl GoalPatch {
    pub fn apply(self, goal: &mut Goal) {
        if let Some(title) = self.title {
            goal.title = title;
        }
        if let Some(target_date) = self.target_date {
            goal.target_date = Some(target_date);
        }
        if let Some(achieved) = self.achieved {
            goal.achieved = achieved;
        }
    }
}
