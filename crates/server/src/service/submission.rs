//! 测验提交：鉴权、评分并记录一次答题。
//!
//! 测验查找、试卷加载与答题记录写入在同一个事务中完成，评分在读写之间于内存中进行。
//! 被拒绝的答案在写入前返回，事务随之回滚。

use anyhow::Context;
use sea_orm::{DatabaseConnection, TransactionTrait};
use selfstudy_core::domain::{
    AccessError, Action, Actor, AnswerSheet, GradeReport, GradingEngine, GradingError, Resource,
    SubmittedAnswer, Target, TestId, authorize,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::repository::{
    AttemptRecord, NewAttempt,
    attempt_repository::insert_attempt,
    test_repository::{find_test, load_test_paper},
};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("test {0} not found")]
    TestNotFound(TestId),
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub attempt: AttemptRecord,
    pub report: GradeReport,
}

#[derive(Clone)]
pub struct SubmissionService {
    db: DatabaseConnection,
    engine: GradingEngine,
}

impl SubmissionService {
    pub fn new(db: DatabaseConnection, engine: GradingEngine) -> Self {
        Self { db, engine }
    }

    /// 对一组答案评分，成功时写入一条答题记录。
    pub async fn submit(
        &self,
        actor: &Actor,
        test_id: TestId,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        authorize(actor, Action::Submit, &Target::collection(Resource::Test))?;
        let user_id = actor.require_authenticated()?;

        let txn = self
            .db
            .begin()
            .await
            .context("failed to begin submission transaction")?;

        if find_test(&txn, test_id).await?.is_none() {
            return Err(SubmissionError::TestNotFound(test_id));
        }

        let paper = load_test_paper(&txn, test_id).await?;
        let sheet = AnswerSheet::collapse(answers);

        let report = match self.engine.grade(&paper, &sheet) {
            Ok(report) => report,
            Err(err) => {
                warn!(%user_id, %test_id, error = %err, "submission rejected");
                return Err(err.into());
            }
        };

        let attempt = insert_attempt(
            &txn,
            NewAttempt {
                user_id,
                test_id,
                score: report.score,
                passed: report.passed,
            },
        )
        .await?;
        txn.commit().await.context("failed to commit test attempt")?;

        info!(
            %user_id,
            %test_id,
            attempt_id = %attempt.id,
            score = report.score.value(),
            passed = report.passed,
            "test attempt recorded"
        );

        Ok(SubmissionOutcome { attempt, report })
    }
}
