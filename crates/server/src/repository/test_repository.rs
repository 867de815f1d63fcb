use crate::entity::{answer, course, material, question, section, test};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select,
};
use selfstudy_core::domain::{
    AnswerId, MaterialId, PaperAnswer, PaperQuestion, QuestionId, Scope, TestId, TestPaper, UserId,
};

#[derive(Debug, Clone)]
pub struct TestRecord {
    pub id: TestId,
    pub title: String,
    pub material_id: MaterialId,
    /// 学习资料所属课程的所有者。
    pub owner_id: UserId,
}

#[derive(Debug, Clone)]
pub struct NewTest {
    pub title: String,
    pub material_id: MaterialId,
}

/// 为 `None` 的字段保持不变。
#[derive(Debug, Clone, Default)]
pub struct TestChanges {
    pub title: Option<String>,
    pub material_id: Option<MaterialId>,
}

#[derive(Debug, Clone)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub test_id: TestId,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub test_id: TestId,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

#[async_trait]
pub trait TestRepository: Send + Sync {
    async fn create(&self, new_test: NewTest) -> Result<TestRecord>;
    async fn find_by_id(&self, test_id: TestId) -> Result<Option<TestRecord>>;
    async fn find_by_material(&self, material_id: MaterialId) -> Result<Option<TestRecord>>;
    async fn list(&self, scope: Scope) -> Result<Vec<TestRecord>>;
    async fn update(&self, test_id: TestId, changes: TestChanges) -> Result<Option<TestRecord>>;
    async fn delete(&self, test_id: TestId) -> Result<bool>;

    async fn questions_of(&self, test_ids: &[TestId]) -> Result<Vec<QuestionRecord>>;
    async fn answers_of(&self, question_ids: &[QuestionId]) -> Result<Vec<AnswerRecord>>;

    async fn create_question(&self, new_question: NewQuestion) -> Result<QuestionRecord>;
    async fn find_question(&self, question_id: QuestionId) -> Result<Option<QuestionRecord>>;
    async fn delete_question(&self, question_id: QuestionId) -> Result<bool>;

    async fn create_answer(&self, new_answer: NewAnswer) -> Result<AnswerRecord>;
    async fn find_answer(&self, answer_id: AnswerId) -> Result<Option<AnswerRecord>>;
    async fn delete_answer(&self, answer_id: AnswerId) -> Result<bool>;
}

#[derive(Debug, FromQueryResult)]
struct TestRow {
    id: i32,
    title: String,
    material_id: i32,
    owner_id: i32,
}

#[derive(Clone)]
pub struct SeaOrmTestRepository {
    db: DatabaseConnection,
}

impl SeaOrmTestRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn select_rows() -> Select<test::Entity> {
        test::Entity::find()
            .select_only()
            .column(test::Column::Id)
            .column(test::Column::Title)
            .column(test::Column::MaterialId)
            .column_as(course::Column::OwnerId, "owner_id")
            .join(JoinType::InnerJoin, test::Relation::Material.def())
            .join(JoinType::InnerJoin, material::Relation::Section.def())
            .join(JoinType::InnerJoin, section::Relation::Course.def())
            .order_by_asc(test::Column::Id)
    }

    fn map_row(row: TestRow) -> TestRecord {
        TestRecord {
            id: TestId::new(row.id),
            title: row.title,
            material_id: MaterialId::new(row.material_id),
            owner_id: UserId::new(row.owner_id),
        }
    }

    fn map_question(model: question::Model) -> QuestionRecord {
        QuestionRecord {
            id: QuestionId::new(model.id),
            test_id: TestId::new(model.test_id),
            text: model.text,
        }
    }

    fn map_answer(model: answer::Model) -> AnswerRecord {
        AnswerRecord {
            id: AnswerId::new(model.id),
            question_id: QuestionId::new(model.question_id),
            text: model.text,
            is_correct: model.is_correct,
        }
    }

    async fn find_one(&self, query: Select<test::Entity>) -> Result<Option<TestRecord>> {
        let row = query.into_model::<TestRow>().one(&self.db).await?;
        Ok(row.map(Self::map_row))
    }
}

#[async_trait]
impl TestRepository for SeaOrmTestRepository {
    async fn create(&self, new_test: NewTest) -> Result<TestRecord> {
        let active_model = test::ActiveModel {
            title: Set(new_test.title),
            material_id: Set(new_test.material_id.value()),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;
        self.find_by_id(TestId::new(model.id))
            .await?
            .ok_or_else(|| anyhow!("test {} missing right after insert", model.id))
    }

    async fn find_by_id(&self, test_id: TestId) -> Result<Option<TestRecord>> {
        find_test(&self.db, test_id).await
    }

    async fn find_by_material(&self, material_id: MaterialId) -> Result<Option<TestRecord>> {
        self.find_one(
            Self::select_rows().filter(test::Column::MaterialId.eq(material_id.value())),
        )
        .await
    }

    async fn list(&self, scope: Scope) -> Result<Vec<TestRecord>> {
        let query = match scope {
            Scope::All => Self::select_rows(),
            Scope::OwnedBy(owner_id) => {
                Self::select_rows().filter(course::Column::OwnerId.eq(owner_id.value()))
            }
            Scope::Account(_) | Scope::Empty => return Ok(Vec::new()),
        };

        let rows = query.into_model::<TestRow>().all(&self.db).await?;
        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    async fn update(&self, test_id: TestId, changes: TestChanges) -> Result<Option<TestRecord>> {
        let Some(model) = test::Entity::find_by_id(test_id.value())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut active_model: test::ActiveModel = model.into();
        if let Some(title) = changes.title {
            active_model.title = Set(title);
        }
        if let Some(material_id) = changes.material_id {
            active_model.material_id = Set(material_id.value());
        }
        active_model.update(&self.db).await?;

        self.find_by_id(test_id).await
    }

    async fn delete(&self, test_id: TestId) -> Result<bool> {
        let result = test::Entity::delete_by_id(test_id.value())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn questions_of(&self, test_ids: &[TestId]) -> Result<Vec<QuestionRecord>> {
        if test_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = question::Entity::find()
            .filter(question::Column::TestId.is_in(test_ids.iter().map(|id| id.value())))
            .order_by_asc(question::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Self::map_question).collect())
    }

    async fn answers_of(&self, question_ids: &[QuestionId]) -> Result<Vec<AnswerRecord>> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = answer::Entity::find()
            .filter(answer::Column::QuestionId.is_in(question_ids.iter().map(|id| id.value())))
            .order_by_asc(answer::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Self::map_answer).collect())
    }

    async fn create_question(&self, new_question: NewQuestion) -> Result<QuestionRecord> {
        let active_model = question::ActiveModel {
            test_id: Set(new_question.test_id.value()),
            text: Set(new_question.text),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;
        Ok(Self::map_question(model))
    }

    async fn find_question(&self, question_id: QuestionId) -> Result<Option<QuestionRecord>> {
        let model = question::Entity::find_by_id(question_id.value())
            .one(&self.db)
            .await?;

        Ok(model.map(Self::map_question))
    }

    async fn delete_question(&self, question_id: QuestionId) -> Result<bool> {
        let result = question::Entity::delete_by_id(question_id.value())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn create_answer(&self, new_answer: NewAnswer) -> Result<AnswerRecord> {
        let active_model = answer::ActiveModel {
            question_id: Set(new_answer.question_id.value()),
            text: Set(new_answer.text),
            is_correct: Set(new_answer.is_correct),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;
        Ok(Self::map_answer(model))
    }

    async fn find_answer(&self, answer_id: AnswerId) -> Result<Option<AnswerRecord>> {
        let model = answer::Entity::find_by_id(answer_id.value())
            .one(&self.db)
            .await?;

        Ok(model.map(Self::map_answer))
    }

    async fn delete_answer(&self, answer_id: AnswerId) -> Result<bool> {
        let result = answer::Entity::delete_by_id(answer_id.value())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

/// 在任意连接（包括事务）上查找测验。
pub async fn find_test<C: ConnectionTrait>(
    db: &C,
    test_id: TestId,
) -> Result<Option<TestRecord>> {
    let row = SeaOrmTestRepository::select_rows()
        .filter(test::Column::Id.eq(test_id.value()))
        .into_model::<TestRow>()
        .one(db)
        .await?;

    Ok(row.map(SeaOrmTestRepository::map_row))
}

/// 加载测验的全部题目与选项，包含正确性。
pub async fn load_test_paper<C: ConnectionTrait>(db: &C, test_id: TestId) -> Result<TestPaper> {
    let questions = question::Entity::find()
        .filter(question::Column::TestId.eq(test_id.value()))
        .order_by_asc(question::Column::Id)
        .all(db)
        .await?;

    let answers = answer::Entity::find()
        .join(JoinType::InnerJoin, answer::Relation::Question.def())
        .filter(question::Column::TestId.eq(test_id.value()))
        .order_by_asc(answer::Column::Id)
        .all(db)
        .await?;

    Ok(TestPaper {
        questions: questions
            .into_iter()
            .map(|model| PaperQuestion {
                id: QuestionId::new(model.id),
                text: model.text,
            })
            .collect(),
        answers: answers
            .into_iter()
            .map(|model| PaperAnswer {
                id: AnswerId::new(model.id),
                question_id: QuestionId::new(model.question_id),
                text: model.text,
                is_correct: model.is_correct,
            })
            .collect(),
    })
}
