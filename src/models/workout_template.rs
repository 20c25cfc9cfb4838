use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplate {
    pub id: i32,
    pub trainer_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkoutTemplate {
    pub trainer_id: i32,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
}

fn default_duration() -> i32 {
    60
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplatePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
}

impl WorkoutTemplatePatch {
    pub fn apply(self, template: &mut WorkoutTemplate) {
        if let Some(name) = self.name {
            template.name = name;
        }
        if let Some(description) = self.description {
            template.description = Some(description);
        }
        if let Some(duration) = self.duration_minutes {
            template.duration_minutes = duration;
        }
    }
}
