use crate::entity::{course, section};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use selfstudy_core::domain::{CourseId, Scope, SectionId, UserId};

#[derive(Debug, Clone)]
pub struct SectionRecord {
    pub id: SectionId,
    pub title: String,
    pub course_id: CourseId,
    /// 上级课程的所有者。
    pub owner_id: UserId,
}

#[derive(Debug, Clone)]
pub struct NewSection {
    pub title: String,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Default)]
pub struct SectionChanges {
    pub title: Option<String>,
    pub course_id: Option<CourseId>,
}

#[async_trait]
pub trait SectionRepository: Send + Sync {
    async fn create(&self, new_section: NewSection) -> Result<SectionRecord>;
    async fn find_by_id(&self, section_id: SectionId) -> Result<Option<SectionRecord>>;
    async fn list(&self, scope: Scope) -> Result<Vec<SectionRecord>>;
    async fn list_by_courses(&self, course_ids: &[CourseId]) -> Result<Vec<SectionRecord>>;
    async fn update(
        &self,
        section_id: SectionId,
        changes: SectionChanges,
    ) -> Result<Option<SectionRecord>>;
    async fn delete(&self, section_id: SectionId) -> Result<bool>;
}

#[derive(Debug, FromQueryResult)]
struct SectionRow {
    id: i32,
    title: String,
    course_id: i32,
    owner_id: i32,
}

#[derive(Clone)]
pub struct SeaOrmSectionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSectionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn select_rows() -> Select<section::Entity> {
        section::Entity::find()
            .select_only()
            .column(section::Column::Id)
            .column(section::Column::Title)
            .column(section::Column::CourseId)
            .column_as(course::Column::OwnerId, "owner_id")
            .join(JoinType::InnerJoin, section::Relation::Course.def())
            .order_by_asc(section::Column::Id)
    }

    fn map_row(row: SectionRow) -> SectionRecord {
        SectionRecord {
            id: SectionId::new(row.id),
            title: row.title,
            course_id: CourseId::new(row.course_id),
            owner_id: UserId::new(row.owner_id),
        }
    }

    async fn fetch(&self, query: Select<section::Entity>) -> Result<Vec<SectionRecord>> {
        let rows = query.into_model::<SectionRow>().all(&self.db).await?;
        Ok(rows.into_iter().map(Self::map_row).collect())
    }
}

#[async_trait]
impl SectionRepository for SeaOrmSectionRepository {
    async fn create(&self, new_section: NewSection) -> Result<SectionRecord> {
        let active_model = section::ActiveModel {
            title: Set(new_section.title),
            course_id: Set(new_section.course_id.value()),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;
        self.find_by_id(SectionId::new(model.id))
            .await?
            .ok_or_else(|| anyhow!("section {} missing right after insert", model.id))
    }

    async fn find_by_id(&self, section_id: SectionId) -> Result<Option<SectionRecord>> {
        let row = Self::select_rows()
            .filter(section::Column::Id.eq(section_id.value()))
            .into_model::<SectionRow>()
            .one(&self.db)
            .await?;

        Ok(row.map(Self::map_row))
    }

    async fn list(&self, scope: Scope) -> Result<Vec<SectionRecord>> {
        let query = match scope {
            Scope::All => Self::select_rows(),
            Scope::OwnedBy(owner_id) => {
                Self::select_rows().filter(course::Column::OwnerId.eq(owner_id.value()))
            }
            Scope::Account(_) | Scope::Empty => return Ok(Vec::new()),
        };

        self.fetch(query).await
    }

    async fn list_by_courses(&self, course_ids: &[CourseId]) -> Result<Vec<SectionRecord>> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Self::select_rows().filter(
            section::Column::CourseId.is_in(course_ids.iter().map(|id| id.value())),
        );

        self.fetch(query).await
    }

    async fn update(
        &self,
        section_id: SectionId,
        changes: SectionChanges,
    ) -> Result<Option<SectionRecord>> {
        let Some(model) = section::Entity::find_by_id(section_id.value())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut active_model: section::ActiveModel = model.into();
        if let Some(title) = changes.title {
            active_model.title = Set(title);
        }
        if let Some(course_id) = changes.course_id {
            active_model.course_id = Set(course_id.value());
        }

        active_model.update(&self.db).await?;
        self.find_by_id(section_id).await
    }

    async fn delete(&self, section_id: SectionId) -> Result<bool> {
        let result = section::Entity::delete_by_id(section_id.value())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
