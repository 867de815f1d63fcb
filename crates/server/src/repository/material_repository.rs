use crate::entity::{course, material, section};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use selfstudy_core::domain::{MaterialId, Scope, SectionId, UserId};

#[derive(Debug, Clone)]
pub struct MaterialRecord {
    pub id: MaterialId,
    pub title: String,
    pub content: String,
    pub section_id: SectionId,
    /// 章节所属课程的所有者。
    pub owner_id: UserId,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub title: String,
    pub content: String,
    pub section_id: SectionId,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub section_id: Option<SectionId>,
}

#[async_trait]
pub trait MaterialRepository: Send + Sync {
    async fn create(&self, new_material: NewMaterial) -> Result<MaterialRecord>;
    async fn find_by_id(&self, material_id: MaterialId) -> Result<Option<MaterialRecord>>;
    async fn list(&self, scope: Scope) -> Result<Vec<MaterialRecord>>;
    async fn list_by_sections(&self, section_ids: &[SectionId]) -> Result<Vec<MaterialRecord>>;
    async fn update(
        &self,
        material_id: MaterialId,
        changes: MaterialChanges,
    ) -> Result<Option<MaterialRecord>>;
    async fn delete(&self, material_id: MaterialId) -> Result<bool>;
}

#[derive(Debug, FromQueryResult)]
struct MaterialRow {
    id: i32,
    title: String,
    content: String,
    section_id: i32,
    owner_id: i32,
}

#[derive(Clone)]
pub struct SeaOrmMaterialRepository {
    db: DatabaseConnection,
}

impl SeaOrmMaterialRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn select_rows() -> Select<material::Entity> {
        material::Entity::find()
            .select_only()
            .column(material::Column::Id)
            .column(material::Column::Title)
            .column(material::Column::Content)
            .column(material::Column::SectionId)
            .column_as(course::Column::OwnerId, "owner_id")
            .join(JoinType::InnerJoin, material::Relation::Section.def())
            .join(JoinType::InnerJoin, section::Relation::Course.def())
            .order_by_asc(material::Column::Id)
    }

    fn map_row(row: MaterialRow) -> MaterialRecord {
        MaterialRecord {
            id: MaterialId::new(row.id),
            title: row.title,
            content: row.content,
            section_id: SectionId::new(row.section_id),
            owner_id: UserId::new(row.owner_id),
        }
    }

    async fn fetch(&self, query: Select<material::Entity>) -> Result<Vec<MaterialRecord>> {
        let rows = query.into_model::<MaterialRow>().all(&self.db).await?;
        Ok(rows.into_iter().map(Self::map_row).collect())
    }
}

#[async_trait]
impl MaterialRepository for SeaOrmMaterialRepository {
    async fn create(&self, new_material: NewMaterial) -> Result<MaterialRecord> {
        let active_model = material::ActiveModel {
            title: Set(new_material.title),
            content: Set(new_material.content),
            section_id: Set(new_material.section_id.value()),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;
        self.find_by_id(MaterialId::new(model.id))
            .await?
            .ok_or_else(|| anyhow!("material {} missing right after insert", model.id))
    }

    async fn find_by_id(&self, material_id: MaterialId) -> Result<Option<MaterialRecord>> {
        let row = Self::select_rows()
            .filter(material::Column::Id.eq(material_id.value()))
            .into_model::<MaterialRow>()
            .one(&self.db)
            .await?;

        Ok(row.map(Self::map_row))
    }

    async fn list(&self, scope: Scope) -> Result<Vec<MaterialRecord>> {
        let query = match scope {
            Scope::All => Self::select_rows(),
            Scope::OwnedBy(owner_id) => {
                Self::select_rows().filter(course::Column::OwnerId.eq(owner_id.value()))
            }
            Scope::Account(_) | Scope::Empty => return Ok(Vec::new()),
        };

        self.fetch(query).await
    }

    async fn list_by_sections(&self, section_ids: &[SectionId]) -> Result<Vec<MaterialRecord>> {
        if section_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Self::select_rows().filter(
            material::Column::SectionId.is_in(section_ids.iter().map(|id| id.value())),
        );

        self.fetch(query).await
    }

    async fn update(
        &self,
        material_id: MaterialId,
        changes: MaterialChanges,
    ) -> Result<Option<MaterialRecord>> {
        let Some(model) = material::Entity::find_by_id(material_id.value())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut active_model: material::ActiveModel = model.into();
        if let Some(title) = changes.title {
            active_model.title = Set(title);
        }
        if let Some(content) = changes.content {
            active_model.content = Set(content);
        }
        if let Some(section_id) = changes.section_id {
            active_model.section_id = Set(section_id.value());
        }

        active_model.update(&self.db).await?;
        self.find_by_id(material_id).await
    }

    async fn delete(&self, material_id: MaterialId) -> Result<bool> {
        let result = material::Entity::delete_by_id(material_id.value())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
