use crate::entity::{course, material, section, test, test_attempt};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select,
};
use selfstudy_core::domain::{AttemptId, Scope, Score, TestId, UserId};

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub id: AttemptId,
    pub user_id: UserId,
    pub test_id: TestId,
    pub score: Score,
    pub passed: bool,
    pub submitted_at: NaiveDateTime,
    /// 测验所属课程的所有者。
    pub test_owner_id: UserId,
}

#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: UserId,
    pub test_id: TestId,
    pub score: Score,
    pub passed: bool,
}

/// 答题记录的只读仓储。记录只会在提交事务中通过 [`insert_attempt`] 追加。
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn find_by_id(&self, attempt_id: AttemptId) -> Result<Option<AttemptRecord>>;
    async fn list(&self, scope: Scope) -> Result<Vec<AttemptRecord>>;
}

#[derive(Debug, FromQueryResult)]
struct AttemptRow {
    id: i32,
    user_id: i32,
    test_id: i32,
    score: i16,
    passed: bool,
    submitted_at: NaiveDateTime,
    owner_id: i32,
}

#[derive(Clone)]
pub struct SeaOrmAttemptRepository {
    db: DatabaseConnection,
}

impl SeaOrmAttemptRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn select_rows() -> Select<test_attempt::Entity> {
        test_attempt::Entity::find()
            .select_only()
            .column(test_attempt::Column::Id)
            .column(test_attempt::Column::UserId)
            .column(test_attempt::Column::TestId)
            .column(test_attempt::Column::Score)
            .column(test_attempt::Column::Passed)
            .column(test_attempt::Column::SubmittedAt)
            .column_as(course::Column::OwnerId, "owner_id")
            .join(JoinType::InnerJoin, test_attempt::Relation::Test.def())
            .join(JoinType::InnerJoin, test::Relation::Material.def())
            .join(JoinType::InnerJoin, material::Relation::Section.def())
            .join(JoinType::InnerJoin, section::Relation::Course.def())
            .order_by_desc(test_attempt::Column::SubmittedAt)
            .order_by_desc(test_attempt::Column::Id)
    }

    fn map_row(row: AttemptRow) -> Result<AttemptRecord> {
        let raw_score = u16::try_from(row.score)
            .map_err(|_| anyhow!("invalid test_attempt.score from database: {}", row.score))?;
        let score = Score::new(raw_score)
            .with_context(|| format!("invalid score on test_attempt {}", row.id))?;

        Ok(AttemptRecord {
            id: AttemptId::new(row.id),
            user_id: UserId::new(row.user_id),
            test_id: TestId::new(row.test_id),
            score,
            passed: row.passed,
            submitted_at: row.submitted_at,
            test_owner_id: UserId::new(row.owner_id),
        })
    }
}

#[async_trait]
impl AttemptRepository for SeaOrmAttemptRepository {
    async fn find_by_id(&self, attempt_id: AttemptId) -> Result<Option<AttemptRecord>> {
        find_attempt(&self.db, attempt_id).await
    }

    async fn list(&self, scope: Scope) -> Result<Vec<AttemptRecord>> {
        let query = match scope {
            Scope::All => Self::select_rows(),
            Scope::OwnedBy(owner_id) => {
                Self::select_rows().filter(course::Column::OwnerId.eq(owner_id.value()))
            }
            Scope::Account(user_id) => {
                Self::select_rows().filter(test_attempt::Column::UserId.eq(user_id.value()))
            }
            Scope::Empty => return Ok(Vec::new()),
        };

        let rows = query.into_model::<AttemptRow>().all(&self.db).await?;
        rows.into_iter().map(Self::map_row).collect()
    }
}

pub async fn insert_attempt<C: ConnectionTrait>(
    db: &C,
    new_attempt: NewAttempt,
) -> Result<AttemptRecord> {
    let raw_score = new_attempt.score.value();
    let score = i16::try_from(raw_score)
        .map_err(|_| anyhow!("score {raw_score} does not fit the score column"))?;

    let active_model = test_attempt::ActiveModel {
        user_id: Set(new_attempt.user_id.value()),
        test_id: Set(new_attempt.test_id.value()),
        score: Set(score),
        passed: Set(new_attempt.passed),
        submitted_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    let model = active_model.insert(db).await?;
    find_attempt(db, AttemptId::new(model.id))
        .await?
        .ok_or_else(|| anyhow!("test_attempt {} missing right after insert", model.id))
}

pub async fn find_attempt<C: ConnectionTrait>(
    db: &C,
    attempt_id: AttemptId,
) -> Result<Option<AttemptRecord>> {
    let row = SeaOrmAttemptRepository::select_rows()
        .filter(test_attempt::Column::Id.eq(attempt_id.value()))
        .into_model::<AttemptRow>()
        .one(db)
        .await?;

    row.map(SeaOrmAttemptRepository::map_row).transpose()
}
