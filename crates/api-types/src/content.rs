//! Course, section and material payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CourseRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CoursePatchRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub owner: i32,
    pub sections: Vec<SectionResponse>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SectionRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub course: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SectionPatchRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub course: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResponse {
    pub id: i32,
    pub title: String,
    pub course: i32,
    pub materials: Vec<MaterialResponse>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MaterialRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub content: String,
    pub section: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MaterialPatchRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub section: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialResponse {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub section: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_description_is_optional() {
        let request: CourseRequest =
            serde_json::from_str(r#"{"title":"Rust"}"#).expect("course should parse");

        assert_eq!(request.description, "");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn blank_title_fails_validation() {
        let request: SectionRequest =
            serde_json::from_str(r#"{"title":"","course":1}"#).expect("shape is valid");

        assert!(request.validate().is_err());
    }
}
