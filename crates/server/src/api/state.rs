//! 统一的应用状态。

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use selfstudy_core::domain::{GradingEngine, PassThreshold};

use crate::{
    auth::TokenIssuer,
    repository::{
        AttemptRepository, CourseRepository, MaterialRepository, SeaOrmAttemptRepository,
        SeaOrmCourseRepository, SeaOrmMaterialRepository, SeaOrmSectionRepository,
        SeaOrmTestRepository, SeaOrmUserRepository, SectionRepository, TestRepository,
        UserRepository,
    },
    service::SubmissionService,
};

/// 统一的应用状态，包含所有处理器共享的数据。
#[derive(Clone)]
pub struct AppState {
    /// 用户仓储。
    pub users: Arc<dyn UserRepository>,
    /// 课程仓储。
    pub courses: Arc<dyn CourseRepository>,
    /// 章节仓储。
    pub sections: Arc<dyn SectionRepository>,
    /// 学习资料仓储。
    pub materials: Arc<dyn MaterialRepository>,
    /// 测验、题目与选项仓储。
    pub tests: Arc<dyn TestRepository>,
    /// 答题记录仓储。
    pub attempts: Arc<dyn AttemptRepository>,
    /// 答案提交与评分服务。
    pub submissions: SubmissionService,
    /// JWT 令牌签发与校验。
    pub tokens: TokenIssuer,
}

impl AppState {
    /// 创建新的应用状态，所有仓储共享同一个数据库连接；及格线在状态生命周期内固定。
    pub fn new(db: DatabaseConnection, threshold: PassThreshold, tokens: TokenIssuer) -> Self {
        Self {
            users: Arc::new(SeaOrmUserRepository::new(db.clone())),
            courses: Arc::new(SeaOrmCourseRepository::new(db.clone())),
            sections: Arc::new(SeaOrmSectionRepository::new(db.clone())),
            materials: Arc::new(SeaOrmMaterialRepository::new(db.clone())),
            tests: Arc::new(SeaOrmTestRepository::new(db.clone())),
            attempts: Arc::new(SeaOrmAttemptRepository::new(db.clone())),
            submissions: SubmissionService::new(db, GradingEngine::new(threshold)),
            tokens,
        }
    }
}
