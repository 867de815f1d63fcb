//! 测验 API 路由：阅读、编写、提交与答题记录。

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use selfstudy_api_types::testing::{
    AnswerDetail, AnswerRequest, AnswerResponse, AuthoredAnswerResponse,
    AuthoredQuestionResponse, QuestionRequest, QuestionResponse, SubmitTestRequest,
    SubmitTestResponse, TestAttemptResponse, TestPatchRequest, TestRequest, TestResponse,
};
use selfstudy_core::domain::{
    Action, Actor, AnswerId, AttemptId, MaterialId, QuestionId, Resource, SubmittedAnswer,
    Target, TestId, UserId, authorize, scope,
};
use tracing::info;

use super::{
    error::ApiError,
    extract::{CurrentActor, IdPath, ValidJson},
    state::AppState,
};
use crate::{
    repository::{
        AnswerRecord, AttemptRecord, NewAnswer, NewQuestion, NewTest, QuestionRecord, TestChanges,
        TestRecord,
    },
    service::SubmissionOutcome,
};

/// 创建测验 API 路由。
pub fn create_testing_router() -> Router<Arc<AppState>> {
    Router::new()
        // 测验列表与创建
        .route("/testing/tests/", get(list_tests).post(create_test))
        // 单个测验
        .route(
            "/testing/tests/{id}/",
            get(retrieve_test)
                .put(update_test)
                .patch(partial_update_test)
                .delete(destroy_test),
        )
        // 提交答案
        .route("/testing/tests/{id}/submit/", post(submit_test))
        // 题目
        .route("/testing/questions/", post(create_question))
        .route("/testing/questions/{id}/", delete(destroy_question))
        // 选项
        .route("/testing/answers/", post(create_answer))
        .route("/testing/answers/{id}/", delete(destroy_answer))
        // 答题记录
        .route("/testing/attempts/", get(list_attempts))
        .route("/testing/attempts/{id}/", get(retrieve_attempt))
}

// 响应

/// 面向学生的测验视图，从不包含选项的正确性。
async fn test_responses(
    state: &AppState,
    tests: Vec<TestRecord>,
) -> Result<Vec<TestResponse>, ApiError> {
    let test_ids: Vec<TestId> = tests.iter().map(|test| test.id).collect();
    let questions = state.tests.questions_of(&test_ids).await?;

    let question_ids: Vec<QuestionId> = questions.iter().map(|question| question.id).collect();
    let mut answers: HashMap<QuestionId, Vec<AnswerResponse>> = HashMap::new();
    for answer in state.tests.answers_of(&question_ids).await? {
        answers.entry(answer.question_id).or_default().push(AnswerResponse {
            id: answer.id.value(),
            text: answer.text,
        });
    }

    let mut nested: HashMap<TestId, Vec<QuestionResponse>> = HashMap::new();
    for question in questions {
        nested.entry(question.test_id).or_default().push(QuestionResponse {
            id: question.id.value(),
            text: question.text,
            answers: answers.remove(&question.id).unwrap_or_default(),
        });
    }

    Ok(tests
        .into_iter()
        .map(|test| TestResponse {
            id: test.id.value(),
            title: test.title,
            material: test.material_id.value(),
            questions: nested.remove(&test.id).unwrap_or_default(),
        })
        .collect())
}

/// 单个测验的视图。
async fn test_response(state: &AppState, test: TestRecord) -> Result<TestResponse, ApiError> {
    test_responses(state, vec![test])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("test"))
}

/// 编写者视角的题目响应。
fn question_response(question: QuestionRecord) -> AuthoredQuestionResponse {
    AuthoredQuestionResponse {
        id: question.id.value(),
        test: question.test_id.value(),
        text: question.text,
    }
}

/// 编写者视角的选项响应，包含正确性。
fn answer_response(answer: AnswerRecord) -> AuthoredAnswerResponse {
    AuthoredAnswerResponse {
        id: answer.id.value(),
        question: answer.question_id.value(),
        text: answer.text,
        is_correct: answer.is_correct,
    }
}

/// 答题记录响应。
fn attempt_response(attempt: AttemptRecord) -> TestAttemptResponse {
    TestAttemptResponse {
        id: attempt.id.value(),
        user: attempt.user_id.value(),
        test: attempt.test_id.value(),
        score: attempt.score.value(),
        passed: attempt.passed,
        submitted_at: attempt.submitted_at,
    }
}

/// 提交结果响应，只列出选中的选项。
fn submission_response(outcome: SubmissionOutcome) -> SubmitTestResponse {
    let report = outcome.report;
    SubmitTestResponse {
        score: report.score.value(),
        passed: report.passed,
        details: report
            .details
            .into_iter()
            .map(|detail| AnswerDetail {
                question_id: detail.question_id.value(),
                question_text: detail.question_text,
                selected_answer_id: detail.selected_answer_id.value(),
                selected_answer_text: detail.selected_answer_text,
                is_correct: detail.is_correct,
            })
            .collect(),
    }
}

// 查找

/// 查找调用者可见的测验。
async fn visible_test(state: &AppState, actor: &Actor, id: TestId) -> Result<TestRecord, ApiError> {
    authorize(actor, Action::Retrieve, &Target::collection(Resource::Test))?;

    match state.tests.find_by_id(id).await? {
        Some(test)
            if scope(actor, Resource::Test)
                .contains(&Target::owned(Resource::Test, test.owner_id)) =>
        {
            Ok(test)
        }
        _ => Err(ApiError::not_found("test")),
    }
}

/// 即将挂载测验的学习资料的所有者。每份资料最多只有一个测验。
async fn free_material_owner(
    state: &AppState,
    material_id: i32,
    except: Option<TestId>,
) -> Result<UserId, ApiError> {
    let material = state
        .materials
        .find_by_id(MaterialId::new(material_id))
        .await?
        .ok_or_else(|| ApiError::validation(format!("invalid material \"{material_id}\"")))?;

    match state.tests.find_by_material(material.id).await? {
        Some(existing) if Some(existing.id) != except => Err(ApiError::validation(
            "test with this material already exists",
        )),
        _ => Ok(material.owner_id),
    }
}

/// 查找题目或选项所属的测验，并校验调用者可以编写它。
async fn authorable_test(
    state: &AppState,
    actor: &Actor,
    action: Action,
    test_id: TestId,
) -> Result<TestRecord, ApiError> {
    let test = state
        .tests
        .find_by_id(test_id)
        .await?
        .ok_or_else(|| ApiError::not_found("test"))?;
    authorize(actor, action, &Target::owned(Resource::Test, test.owner_id))?;
    Ok(test)
}

// 测验

/// 列出测验。
async fn list_tests(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<TestResponse>>, ApiError> {
    authorize(&actor, Action::List, &Target::collection(Resource::Test))?;

    let tests = state.tests.list(scope(&actor, Resource::Test)).await?;
    Ok(Json(test_responses(&state, tests).await?))
}

/// 获取测验详情。
async fn retrieve_test(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<Json<TestResponse>, ApiError> {
    let test = visible_test(&state, &actor, TestId::new(id)).await?;
    Ok(Json(test_response(&state, test).await?))
}

/// 创建测验。
async fn create_test(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    ValidJson(request): ValidJson<TestRequest>,
) -> Result<(StatusCode, Json<TestResponse>), ApiError> {
    actor.require_authenticated()?;
    let owner_id = free_material_owner(&state, request.material, None).await?;
    authorize(&actor, Action::Create, &Target::owned(Resource::Test, owner_id))?;

    let test = state
        .tests
        .create(NewTest {
            title: request.title,
            material_id: MaterialId::new(request.material),
        })
        .await?;

    info!(test_id = %test.id, material_id = %test.material_id, "test created");
    Ok((StatusCode::CREATED, Json(test_response(&state, test).await?)))
}

/// 整体更新测验。
async fn update_test(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<TestRequest>,
) -> Result<Json<TestResponse>, ApiError> {
    let test = visible_test(&state, &actor, TestId::new(id)).await?;
    authorize(&actor, Action::Update, &Target::owned(Resource::Test, test.owner_id))?;

    if request.material != test.material_id.value() {
        let owner_id = free_material_owner(&state, request.material, Some(test.id)).await?;
        authorize(&actor, Action::Update, &Target::owned(Resource::Test, owner_id))?;
    }

    let changes = TestChanges {
        title: Some(request.title),
        material_id: Some(MaterialId::new(request.material)),
    };
    save_test(&state, test.id, changes).await
}

/// 部分更新测验。
async fn partial_update_test(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<TestPatchRequest>,
) -> Result<Json<TestResponse>, ApiError> {
    let test = visible_test(&state, &actor, TestId::new(id)).await?;
    authorize(&actor, Action::PartialUpdate, &Target::owned(Resource::Test, test.owner_id))?;

    let changes = TestChanges {
        title: request.title,
        material_id: None,
    };
    save_test(&state, test.id, changes).await
}

/// 校验权限后写入测验变更。
async fn save_test(
    state: &AppState,
    id: TestId,
    changes: TestChanges,
) -> Result<Json<TestResponse>, ApiError> {
    let test = state
        .tests
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("test"))?;
    Ok(Json(test_response(state, test).await?))
}

/// 删除测验。
async fn destroy_test(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<StatusCode, ApiError> {
    let test = visible_test(&state, &actor, TestId::new(id)).await?;
    authorize(&actor, Action::Destroy, &Target::owned(Resource::Test, test.owner_id))?;

    if !state.tests.delete(test.id).await? {
        return Err(ApiError::not_found("test"));
    }
    info!(test_id = %test.id, "test deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// 提交一组答案并评分，成功时记录一次答题。
async fn submit_test(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<SubmitTestRequest>,
) -> Result<Json<SubmitTestResponse>, ApiError> {
    let answers = request
        .answers
        .into_iter()
        .map(|answer| SubmittedAnswer {
            question_id: QuestionId::new(answer.question_id),
            selected_answer_id: AnswerId::new(answer.selected_answer_id),
        })
        .collect();

    let outcome = state
        .submissions
        .submit(&actor, TestId::new(id), answers)
        .await?;
    Ok(Json(submission_response(outcome)))
}

// 题目与选项

/// 创建题目。
async fn create_question(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    ValidJson(request): ValidJson<QuestionRequest>,
) -> Result<(StatusCode, Json<AuthoredQuestionResponse>), ApiError> {
    actor.require_authenticated()?;
    let test = authorable_test(&state, &actor, Action::Update, TestId::new(request.test))
        .await
        .map_err(|err| missing_parent(err, "test", request.test))?;

    let question = state
        .tests
        .create_question(NewQuestion {
            test_id: test.id,
            text: request.text,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(question_response(question))))
}

/// 删除题目。
async fn destroy_question(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<StatusCode, ApiError> {
    actor.require_authenticated()?;
    let question = state
        .tests
        .find_question(QuestionId::new(id))
        .await?
        .ok_or_else(|| ApiError::not_found("question"))?;
    authorable_test(&state, &actor, Action::Update, question.test_id).await?;

    if !state.tests.delete_question(question.id).await? {
        return Err(ApiError::not_found("question"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// 创建选项。
async fn create_answer(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    ValidJson(request): ValidJson<AnswerRequest>,
) -> Result<(StatusCode, Json<AuthoredAnswerResponse>), ApiError> {
    actor.require_authenticated()?;
    let question = state
        .tests
        .find_question(QuestionId::new(request.question))
        .await?
        .ok_or_else(|| {
            ApiError::validation(format!("invalid question \"{}\"", request.question))
        })?;
    authorable_test(&state, &actor, Action::Update, question.test_id).await?;

    let answer = state
        .tests
        .create_answer(NewAnswer {
            question_id: question.id,
            text: request.text,
            is_correct: request.is_correct,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(answer_response(answer))))
}

/// 删除选项。
async fn destroy_answer(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<StatusCode, ApiError> {
    actor.require_authenticated()?;
    let answer = state
        .tests
        .find_answer(AnswerId::new(id))
        .await?
        .ok_or_else(|| ApiError::not_found("answer"))?;
    let question = state
        .tests
        .find_question(answer.question_id)
        .await?
        .ok_or_else(|| ApiError::not_found("answer"))?;
    authorable_test(&state, &actor, Action::Update, question.test_id).await?;

    if !state.tests.delete_answer(answer.id).await? {
        return Err(ApiError::not_found("answer"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// 请求体引用不存在的上级记录时属于校验错误，而不是 404。
fn missing_parent(err: ApiError, what: &str, id: i32) -> ApiError {
    if err.status() == StatusCode::NOT_FOUND {
        ApiError::validation(format!("invalid {what} \"{id}\""))
    } else {
        err
    }
}

// 答题记录

/// 列出调用者可见的答题记录，最新的在前。
async fn list_attempts(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<TestAttemptResponse>>, ApiError> {
    authorize(&actor, Action::List, &Target::collection(Resource::Attempt))?;

    let attempts = state.attempts.list(scope(&actor, Resource::Attempt)).await?;
    Ok(Json(attempts.into_iter().map(attempt_response).collect()))
}

/// 获取答题记录详情。
async fn retrieve_attempt(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<Json<TestAttemptResponse>, ApiError> {
    actor.require_authenticated()?;

    let attempt = match state.attempts.find_by_id(AttemptId::new(id)).await? {
        Some(attempt)
            if scope(&actor, Resource::Attempt)
                .contains(&Target::attempt(attempt.user_id, attempt.test_owner_id)) =>
        {
            attempt
        }
        _ => return Err(ApiError::not_found("attempt")),
    };
    authorize(
        &actor,
        Action::Retrieve,
        &Target::attempt(attempt.user_id, attempt.test_owner_id),
    )?;

    Ok(Json(attempt_response(attempt)))
}
