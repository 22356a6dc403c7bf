use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::warn;

use super::KeyValueStore;

/// Last playback position per (course, lesson), in seconds.
#[derive(Clone)]
pub struct ProgressStore {
    backend: Arc<dyn KeyValueStore>,
}

pub(crate) fn progress_key(course_id: &str, lesson_id: &str) -> String {
    format!("course-{course_id}-lesson-{lesson_id}")
}

impl ProgressStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn load(&self, course_id: &str, lesson_id: &str) -> Result<Option<f64>> {
        let key = progress_key(course_id, lesson_id);
        let Some(raw) = self.backend.get(&key)? else {
            return Ok(None);
        };
        match raw.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() => Ok(Some(seconds)),
            _ => {
                warn!(key = %key, value = %raw, "ignoring unparsable playback position");
                Ok(None)
            }
        }
    }

    pub fn save(&self, course_id: &str, lesson_id: &str, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            bail!("invalid playback position {seconds} for course {course_id} lesson {lesson_id}");
        }
        // f64's Display is the shortest string that parses back to the same value.
        self.backend
            .set(&progress_key(course_id, lesson_id), &seconds.to_string())
    }
}
