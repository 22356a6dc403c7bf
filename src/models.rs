use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Unlocked,
    Locked,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseMeta {
    pub slug: Option<String>,
    pub skills: Vec<String>,
    pub course_video_preview: Option<VideoPreview>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoPreview {
    pub link: String,
    pub duration: Option<f64>,
    pub preview_image_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preview_image_link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lessons_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: CourseMeta,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub launch_date: Option<String>,
}

impl Course {
    pub fn cover_url(&self) -> String {
        format!("{}/cover.webp", self.preview_image_link.trim_end_matches('/'))
    }

    pub fn skills_count(&self) -> usize {
        self.meta.skills.len()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preview_image_link: String,
    pub status: LessonStatus,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl Lesson {
    pub fn is_unlocked(&self) -> bool {
        self.status == LessonStatus::Unlocked
    }

    pub fn preview_url(&self) -> String {
        format!(
            "{}/lesson-{}.webp",
            self.preview_image_link.trim_end_matches('/'),
            self.order
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CourseListResponse {
    #[serde(default)]
    pub(crate) courses: Vec<Course>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) token: String,
}

/// Identifiers are opaque; the backend sends UUID strings but numeric ids
/// show up in older payloads.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
