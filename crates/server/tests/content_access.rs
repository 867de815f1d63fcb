mod common;

use axum::http::StatusCode;
use common::{TestApp, id_of};
use selfstudy_core::domain::Role;
use serde_json::json;

fn len(value: &serde_json::Value) -> Option<usize> {
    value.as_array().map(Vec::len)
}

#[tokio::test]
async fn test_course_listing_is_scoped_by_role() {
    let app = TestApp::new().await;
    let admin = app.seed_user("admin@example.com", Role::Admin).await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let other_teacher = app.seed_user("other@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    app.seed_material(&teacher).await;
    app.seed_material(&other_teacher).await;

    let (status, own) = app.get("/content/courses/", Some(&teacher)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(len(&own), Some(1));
    assert_eq!(own[0]["owner"], teacher.id.value());

    let (_, all) = app.get("/content/courses/", Some(&student)).await;
    assert_eq!(len(&all), Some(2));

    let (_, all) = app.get("/content/courses/", Some(&admin)).await;
    assert_eq!(len(&all), Some(2));

    let (status, _) = app.get("/content/courses/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_course_nests_sections_and_materials() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let (course_id, section_id, material_id) = app.seed_material(&teacher).await;

    let (status, course) = app
        .get(&format!("/content/courses/{course_id}/"), Some(&teacher))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(course["title"], "Arithmetic");
    assert_eq!(course["sections"][0]["id"], section_id);
    assert_eq!(course["sections"][0]["materials"][0]["id"], material_id);
    assert_eq!(course["sections"][0]["materials"][0]["content"], "2+2");
}

#[tokio::test]
async fn test_only_authors_create_courses() {
    let app = TestApp::new().await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let body = json!({"title": "Forbidden"});

    let (status, body_out) = app.post("/content/courses/", Some(&student), body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body_out["code"], "forbidden");

    let (status, _) = app.post("/content/courses/", None, body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_course_mutation_requires_ownership() {
    let app = TestApp::new().await;
    let admin = app.seed_user("admin@example.com", Role::Admin).await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let other_teacher = app.seed_user("other@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (course_id, _, _) = app.seed_material(&teacher).await;
    let uri = format!("/content/courses/{course_id}/");

    let (status, _) = app
        .patch(&uri, Some(&other_teacher), json!({"title": "Taken"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.patch(&uri, Some(&student), json!({"title": "Taken"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, course) = app
        .patch(&uri, Some(&teacher), json!({"title": "Arithmetic II"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(course["title"], "Arithmetic II");
    assert_eq!(course["description"], "Basics");

    let (status, course) = app
        .put(&uri, Some(&admin), json!({"title": "Numbers", "description": "All of them"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(course["description"], "All of them");
    assert_eq!(course["owner"], teacher.id.value());
}

#[tokio::test]
async fn test_deleting_course_cascades() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let (course_id, section_id, material_id) = app.seed_material(&teacher).await;

    let (status, body) = app
        .delete(&format!("/content/courses/{course_id}/"), Some(&teacher))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = app
        .get(&format!("/content/sections/{section_id}/"), Some(&teacher))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .get(&format!("/content/materials/{material_id}/"), Some(&teacher))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sections_follow_course_ownership() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let other_teacher = app.seed_user("other@example.com", Role::Teacher).await;
    let (course_id, section_id, _) = app.seed_material(&teacher).await;
    let (other_course_id, _, _) = app.seed_material(&other_teacher).await;

    let (status, _) = app
        .post(
            "/content/sections/",
            Some(&other_teacher),
            json!({"title": "Intruder", "course": course_id}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/content/sections/",
            Some(&teacher),
            json!({"title": "Nowhere", "course": 9999}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = app
        .patch(
            &format!("/content/sections/{section_id}/"),
            Some(&teacher),
            json!({"course": other_course_id}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, sections) = app.get("/content/sections/", Some(&other_teacher)).await;
    assert_eq!(len(&sections), Some(1));
    assert_eq!(sections[0]["course"], other_course_id);
}

#[tokio::test]
async fn test_materials_are_visible_to_students() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (_, section_id, material_id) = app.seed_material(&teacher).await;

    let (status, material) = app
        .get(&format!("/content/materials/{material_id}/"), Some(&student))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(material["section"], section_id);

    let (status, _) = app
        .post(
            "/content/materials/",
            Some(&student),
            json!({"title": "Notes", "content": "", "section": section_id}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_test_reading_hides_correct_answers() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, question_id, right, _) = app.seed_sample_test(&teacher).await;

    let (status, test) = app
        .get(&format!("/testing/tests/{test_id}/"), Some(&student))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(test["title"], "Sample Test");
    assert_eq!(test["questions"][0]["id"], question_id);
    assert_eq!(test["questions"][0]["answers"][0]["id"], right);
    assert!(test["questions"][0]["answers"][0].get("is_correct").is_none());

    let (_, tests) = app.get("/testing/tests/", Some(&student)).await;
    assert_eq!(len(&tests), Some(1));

    let (status, _) = app.get("/testing/tests/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authoring_requires_owning_teacher() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let other_teacher = app.seed_user("other@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, question_id, right, _) = app.seed_sample_test(&teacher).await;

    let (status, _) = app
        .post(
            "/testing/questions/",
            Some(&student),
            json!({"test": test_id, "text": "Cheat?"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/testing/answers/{right}/"), Some(&other_teacher))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .patch(
            &format!("/testing/tests/{test_id}/"),
            Some(&other_teacher),
            json!({"title": "Renamed"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, test) = app
        .patch(
            &format!("/testing/tests/{test_id}/"),
            Some(&teacher),
            json!({"title": "Renamed"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(test["title"], "Renamed");

    let (status, _) = app
        .delete(&format!("/testing/questions/{question_id}/"), Some(&teacher))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, test) = app
        .get(&format!("/testing/tests/{test_id}/"), Some(&teacher))
        .await;
    assert_eq!(len(&test["questions"]), Some(0));
}

#[tokio::test]
async fn test_material_holds_a_single_test() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let (_, _, material_id) = app.seed_material(&teacher).await;
    let body = json!({"title": "Quiz", "material": material_id});

    let (status, test) = app.post("/testing/tests/", Some(&teacher), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(test["material"], material_id);
    assert!(id_of(&test) > 0);

    let (status, err) = app.post("/testing/tests/", Some(&teacher), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "validation_error");
}

#[tokio::test]
async fn test_unparsable_ids_answer_not_found() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;

    for uri in [
        "/content/courses/abc/",
        "/content/sections/99999999999/",
        "/testing/tests/-/",
        "/authentication/register/1.5/",
    ] {
        let (status, body) = app.get(uri, Some(&teacher)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["code"], "not_found", "{uri}");
    }
}
