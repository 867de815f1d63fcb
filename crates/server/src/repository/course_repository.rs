use crate::entity::course;
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use selfstudy_core::domain::{CourseId, Scope, UserId};

#[derive(Debug, Clone)]
pub struct CourseRecord {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub owner_id: UserId,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub owner_id: UserId,
}

#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, new_course: NewCourse) -> Result<CourseRecord>;
    async fn find_by_id(&self, course_id: CourseId) -> Result<Option<CourseRecord>>;
    async fn list(&self, scope: Scope) -> Result<Vec<CourseRecord>>;
    async fn update(&self, course_id: CourseId, changes: CourseChanges)
    -> Result<Option<CourseRecord>>;
    /// 课程下的章节与学习资料一并删除。
    async fn delete(&self, course_id: CourseId) -> Result<bool>;
}

#[derive(Clone)]
pub struct SeaOrmCourseRepository {
    db: DatabaseConnection,
}

impl SeaOrmCourseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn map_model(model: course::Model) -> CourseRecord {
        CourseRecord {
            id: CourseId::new(model.id),
            title: model.title,
            description: model.description,
            owner_id: UserId::new(model.owner_id),
        }
    }
}

#[async_trait]
impl CourseRepository for SeaOrmCourseRepository {
    async fn create(&self, new_course: NewCourse) -> Result<CourseRecord> {
        let active_model = course::ActiveModel {
            title: Set(new_course.title),
            description: Set(new_course.description),
            owner_id: Set(new_course.owner_id.value()),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;
        Ok(Self::map_model(model))
    }

    async fn find_by_id(&self, course_id: CourseId) -> Result<Option<CourseRecord>> {
        let model = course::Entity::find_by_id(course_id.value())
            .one(&self.db)
            .await?;

        Ok(model.map(Self::map_model))
    }

    async fn list(&self, scope: Scope) -> Result<Vec<CourseRecord>> {
        let query = match scope {
            Scope::All => course::Entity::find(),
            Scope::OwnedBy(owner_id) => {
                course::Entity::find().filter(course::Column::OwnerId.eq(owner_id.value()))
            }
            Scope::Account(_) | Scope::Empty => return Ok(Vec::new()),
        };

        let models = query
            .order_by_asc(course::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Self::map_model).collect())
    }

    async fn update(
        &self,
        course_id: CourseId,
        changes: CourseChanges,
    ) -> Result<Option<CourseRecord>> {
        let Some(model) = course::Entity::find_by_id(course_id.value())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut active_model: course::ActiveModel = model.into();
        if let Some(title) = changes.title {
            active_model.title = Set(title);
        }
        if let Some(description) = changes.description {
            active_model.description = Set(description);
        }

        let updated = active_model.update(&self.db).await?;
        Ok(Some(Self::map_model(updated)))
    }

    async fn delete(&self, course_id: CourseId) -> Result<bool> {
        let result = course::Entity::delete_by_id(course_id.value())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
