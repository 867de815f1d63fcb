//! 课程、章节与学习资料 API 路由。
//!
//! 每次查找都先经过调用者的 [`scope`]，范围之外的记录返回 404；可见但无权修改的记录返回 403。

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use selfstudy_api_types::content::{
    CoursePatchRequest, CourseRequest, CourseResponse, MaterialPatchRequest, MaterialRequest,
    MaterialResponse, SectionPatchRequest, SectionRequest, SectionResponse,
};
use selfstudy_core::domain::{
    Action, Actor, CourseId, MaterialId, Resource, SectionId, Target, UserId, authorize, scope,
};
use tracing::info;

use super::{
    error::ApiError,
    extract::{CurrentActor, IdPath, ValidJson},
    state::AppState,
};
use crate::repository::{
    CourseChanges, CourseRecord, MaterialChanges, MaterialRecord, NewCourse, NewMaterial,
    NewSection, SectionChanges, SectionRecord,
};

/// 创建内容 API 路由。
pub fn create_content_router() -> Router<Arc<AppState>> {
    Router::new()
        // 课程列表与创建
        .route("/content/courses/", get(list_courses).post(create_course))
        // 单个课程
        .route(
            "/content/courses/{id}/",
            get(retrieve_course)
                .put(update_course)
                .patch(partial_update_course)
                .delete(destroy_course),
        )
        // 章节列表与创建
        .route("/content/sections/", get(list_sections).post(create_section))
        // 单个章节
        .route(
            "/content/sections/{id}/",
            get(retrieve_section)
                .put(update_section)
                .patch(partial_update_section)
                .delete(destroy_section),
        )
        // 学习资料列表与创建
        .route("/content/materials/", get(list_materials).post(create_material))
        // 单个学习资料
        .route(
            "/content/materials/{id}/",
            get(retrieve_material)
                .put(update_material)
                .patch(partial_update_material)
                .delete(destroy_material),
        )
}

// 嵌套响应

/// 学习资料响应。
fn material_response(material: MaterialRecord) -> MaterialResponse {
    MaterialResponse {
        id: material.id.value(),
        title: material.title,
        content: material.content,
        section: material.section_id.value(),
    }
}

/// 章节响应，内嵌其学习资料。
async fn section_responses(
    state: &AppState,
    sections: Vec<SectionRecord>,
) -> Result<Vec<SectionResponse>, ApiError> {
    let ids: Vec<SectionId> = sections.iter().map(|section| section.id).collect();
    let mut materials: HashMap<SectionId, Vec<MaterialResponse>> = HashMap::new();
    for material in state.materials.list_by_sections(&ids).await? {
        materials
            .entry(material.section_id)
            .or_default()
            .push(material_response(material));
    }

    Ok(sections
        .into_iter()
        .map(|section| SectionResponse {
            id: section.id.value(),
            title: section.title,
            course: section.course_id.value(),
            materials: materials.remove(&section.id).unwrap_or_default(),
        })
        .collect())
}

/// 课程响应，内嵌章节与学习资料。
async fn course_responses(
    state: &AppState,
    courses: Vec<CourseRecord>,
) -> Result<Vec<CourseResponse>, ApiError> {
    let ids: Vec<CourseId> = courses.iter().map(|course| course.id).collect();
    let sections = state.sections.list_by_courses(&ids).await?;

    let mut nested: HashMap<i32, Vec<SectionResponse>> = HashMap::new();
    for section in section_responses(state, sections).await? {
        nested.entry(section.course).or_default().push(section);
    }

    Ok(courses
        .into_iter()
        .map(|course| CourseResponse {
            id: course.id.value(),
            title: course.title,
            description: course.description,
            owner: course.owner_id.value(),
            sections: nested.remove(&course.id.value()).unwrap_or_default(),
        })
        .collect())
}

/// 单个课程的嵌套响应。
async fn course_response(
    state: &AppState,
    course: CourseRecord,
) -> Result<CourseResponse, ApiError> {
    course_responses(state, vec![course])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("course"))
}

/// 单个章节的嵌套响应。
async fn section_response(
    state: &AppState,
    section: SectionRecord,
) -> Result<SectionResponse, ApiError> {
    section_responses(state, vec![section])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("section"))
}

// 查找

/// 查找调用者可见的课程，范围之外返回 404。
async fn visible_course(
    state: &AppState,
    actor: &Actor,
    id: CourseId,
) -> Result<CourseRecord, ApiError> {
    authorize(actor, Action::Retrieve, &Target::collection(Resource::Course))?;

    match state.courses.find_by_id(id).await? {
        Some(course)
            if scope(actor, Resource::Course)
                .contains(&Target::owned(Resource::Course, course.owner_id)) =>
        {
            Ok(course)
        }
        _ => Err(ApiError::not_found("course")),
    }
}

/// 查找调用者可见的章节。
async fn visible_section(
    state: &AppState,
    actor: &Actor,
    id: SectionId,
) -> Result<SectionRecord, ApiError> {
    authorize(actor, Action::Retrieve, &Target::collection(Resource::Section))?;

    match state.sections.find_by_id(id).await? {
        Some(section)
            if scope(actor, Resource::Section)
                .contains(&Target::owned(Resource::Section, section.owner_id)) =>
        {
            Ok(section)
        }
        _ => Err(ApiError::not_found("section")),
    }
}

/// 查找调用者可见的学习资料。
async fn visible_material(
    state: &AppState,
    actor: &Actor,
    id: MaterialId,
) -> Result<MaterialRecord, ApiError> {
    authorize(actor, Action::Retrieve, &Target::collection(Resource::Material))?;

    match state.materials.find_by_id(id).await? {
        Some(material)
            if scope(actor, Resource::Material)
                .contains(&Target::owned(Resource::Material, material.owner_id)) =>
        {
            Ok(material)
        }
        _ => Err(ApiError::not_found("material")),
    }
}

/// 新建或移动章节时，目标课程的所有者。
async fn parent_course_owner(state: &AppState, course_id: i32) -> Result<UserId, ApiError> {
    state
        .courses
        .find_by_id(CourseId::new(course_id))
        .await?
        .map(|course| course.owner_id)
        .ok_or_else(|| ApiError::validation(format!("invalid course \"{course_id}\"")))
}

/// 新建或移动学习资料时，目标章节所属课程的所有者。
async fn parent_section_owner(state: &AppState, section_id: i32) -> Result<UserId, ApiError> {
    state
        .sections
        .find_by_id(SectionId::new(section_id))
        .await?
        .map(|section| section.owner_id)
        .ok_or_else(|| ApiError::validation(format!("invalid section \"{section_id}\"")))
}

// 课程

/// 列出课程。
async fn list_courses(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    authorize(&actor, Action::List, &Target::collection(Resource::Course))?;

    let courses = state.courses.list(scope(&actor, Resource::Course)).await?;
    Ok(Json(course_responses(&state, courses).await?))
}

/// 创建课程。
async fn create_course(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    ValidJson(request): ValidJson<CourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    authorize(&actor, Action::Create, &Target::collection(Resource::Course))?;
    let owner_id = actor.require_authenticated()?;

    let course = state
        .courses
        .create(NewCourse {
            title: request.title,
            description: request.description,
            owner_id,
        })
        .await?;

    info!(course_id = %course.id, %owner_id, "course created");
    Ok((StatusCode::CREATED, Json(course_response(&state, course).await?)))
}

/// 获取课程详情。
async fn retrieve_course(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = visible_course(&state, &actor, CourseId::new(id)).await?;
    Ok(Json(course_response(&state, course).await?))
}

/// 整体更新课程。
async fn update_course(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<CourseRequest>,
) -> Result<Json<CourseResponse>, ApiError> {
    let changes = CourseChanges {
        title: Some(request.title),
        description: Some(request.description),
    };
    save_course(&state, &actor, CourseId::new(id), Action::Update, changes).await
}

/// 部分更新课程。
async fn partial_update_course(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<CoursePatchRequest>,
) -> Result<Json<CourseResponse>, ApiError> {
    let changes = CourseChanges {
        title: request.title,
        description: request.description,
    };
    save_course(&state, &actor, CourseId::new(id), Action::PartialUpdate, changes).await
}

/// 校验权限后写入课程变更。
async fn save_course(
    state: &AppState,
    actor: &Actor,
    id: CourseId,
    action: Action,
    changes: CourseChanges,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = visible_course(state, actor, id).await?;
    authorize(actor, action, &Target::owned(Resource::Course, course.owner_id))?;

    let course = state
        .courses
        .update(course.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("course"))?;
    Ok(Json(course_response(state, course).await?))
}

/// 删除课程，级联删除其章节与资料。
async fn destroy_course(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<StatusCode, ApiError> {
    let course = visible_course(&state, &actor, CourseId::new(id)).await?;
    authorize(&actor, Action::Destroy, &Target::owned(Resource::Course, course.owner_id))?;

    if !state.courses.delete(course.id).await? {
        return Err(ApiError::not_found("course"));
    }
    info!(course_id = %course.id, "course deleted");
    Ok(StatusCode::NO_CONTENT)
}

// 章节

/// 列出章节。
async fn list_sections(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<SectionResponse>>, ApiError> {
    authorize(&actor, Action::List, &Target::collection(Resource::Section))?;

    let sections = state.sections.list(scope(&actor, Resource::Section)).await?;
    Ok(Json(section_responses(&state, sections).await?))
}

/// 创建章节。
async fn create_section(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    ValidJson(request): ValidJson<SectionRequest>,
) -> Result<(StatusCode, Json<SectionResponse>), ApiError> {
    actor.require_authenticated()?;
    let owner_id = parent_course_owner(&state, request.course).await?;
    authorize(&actor, Action::Create, &Target::owned(Resource::Section, owner_id))?;

    let section = state
        .sections
        .create(NewSection {
            title: request.title,
            course_id: CourseId::new(request.course),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(section_response(&state, section).await?)))
}

/// 获取章节详情。
async fn retrieve_section(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<Json<SectionResponse>, ApiError> {
    let section = visible_section(&state, &actor, SectionId::new(id)).await?;
    Ok(Json(section_response(&state, section).await?))
}

/// 整体更新章节。
async fn update_section(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<SectionRequest>,
) -> Result<Json<SectionResponse>, ApiError> {
    let changes = SectionPatchRequest {
        title: Some(request.title),
        course: Some(request.course),
    };
    save_section(&state, &actor, SectionId::new(id), Action::Update, changes).await
}

/// 部分更新章节。
async fn partial_update_section(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<SectionPatchRequest>,
) -> Result<Json<SectionResponse>, ApiError> {
    save_section(&state, &actor, SectionId::new(id), Action::PartialUpdate, request).await
}

/// 校验权限后写入章节变更，移动到其他课程时按新课程重新鉴权。
async fn save_section(
    state: &AppState,
    actor: &Actor,
    id: SectionId,
    action: Action,
    request: SectionPatchRequest,
) -> Result<Json<SectionResponse>, ApiError> {
    let section = visible_section(state, actor, id).await?;
    authorize(actor, action, &Target::owned(Resource::Section, section.owner_id))?;

    if let Some(course) = request.course {
        let owner_id = parent_course_owner(state, course).await?;
        authorize(actor, action, &Target::owned(Resource::Section, owner_id))?;
    }

    let changes = SectionChanges {
        title: request.title,
        course_id: request.course.map(CourseId::new),
    };
    let section = state
        .sections
        .update(section.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("section"))?;
    Ok(Json(section_response(state, section).await?))
}

/// 删除章节。
async fn destroy_section(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<StatusCode, ApiError> {
    let section = visible_section(&state, &actor, SectionId::new(id)).await?;
    authorize(&actor, Action::Destroy, &Target::owned(Resource::Section, section.owner_id))?;

    if !state.sections.delete(section.id).await? {
        return Err(ApiError::not_found("section"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// 学习资料

/// 列出学习资料。
async fn list_materials(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<MaterialResponse>>, ApiError> {
    authorize(&actor, Action::List, &Target::collection(Resource::Material))?;

    let materials = state.materials.list(scope(&actor, Resource::Material)).await?;
    Ok(Json(materials.into_iter().map(material_response).collect()))
}

/// 创建学习资料。
async fn create_material(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    ValidJson(request): ValidJson<MaterialRequest>,
) -> Result<(StatusCode, Json<MaterialResponse>), ApiError> {
    actor.require_authenticated()?;
    let owner_id = parent_section_owner(&state, request.section).await?;
    authorize(&actor, Action::Create, &Target::owned(Resource::Material, owner_id))?;

    let material = state
        .materials
        .create(NewMaterial {
            title: request.title,
            content: request.content,
            section_id: SectionId::new(request.section),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(material_response(material))))
}

/// 获取学习资料详情。
async fn retrieve_material(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<Json<MaterialResponse>, ApiError> {
    let material = visible_material(&state, &actor, MaterialId::new(id)).await?;
    Ok(Json(material_response(material)))
}

/// 整体更新学习资料。
async fn update_material(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<MaterialRequest>,
) -> Result<Json<MaterialResponse>, ApiError> {
    let changes = MaterialPatchRequest {
        title: Some(request.title),
        content: Some(request.content),
        section: Some(request.section),
    };
    save_material(&state, &actor, MaterialId::new(id), Action::Update, changes).await
}

/// 部分更新学习资料。
async fn partial_update_material(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<MaterialPatchRequest>,
) -> Result<Json<MaterialResponse>, ApiError> {
    save_material(&state, &actor, MaterialId::new(id), Action::PartialUpdate, request).await
}

/// 校验权限后写入学习资料变更。
async fn save_material(
    state: &AppState,
    actor: &Actor,
    id: MaterialId,
    action: Action,
    request: MaterialPatchRequest,
) -> Result<Json<MaterialResponse>, ApiError> {
    let material = visible_material(state, actor, id).await?;
    authorize(actor, action, &Target::owned(Resource::Material, material.owner_id))?;

    if let Some(section) = request.section {
        let owner_id = parent_section_owner(state, section).await?;
        authorize(actor, action, &Target::owned(Resource::Material, owner_id))?;
    }

    let changes = MaterialChanges {
        title: request.title,
        content: request.content,
        section_id: request.section.map(SectionId::new),
    };
    let material = state
        .materials
        .update(material.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("material"))?;
    Ok(Json(material_response(material)))
}

/// 删除学习资料。
async fn destroy_material(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<StatusCode, ApiError> {
    let material = visible_material(&state, &actor, MaterialId::new(id)).await?;
    authorize(&actor, Action::Destroy, &Target::owned(Resource::Material, material.owner_id))?;

    if !state.materials.delete(material.id).await? {
        return Err(ApiError::not_found("material"));
    }
    Ok(StatusCode::NO_CONTENT)
}
