use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Email, 255).unique_key())
                    .col(string(Users::PasswordHash))
                    // Role enum is represented in app code. DB stores compact numeric code.
                    // 0=student, 1=teacher, 2=admin
                    .col(
                        small_integer(Users::Role)
                            .default(0)
                            .check(Expr::col(Users::Role).gte(0))
                            .check(Expr::col(Users::Role).lte(2)),
                    )
                    .col(string_len_null(Users::FirstName, 40))
                    .col(string_len_null(Users::LastName, 40))
                    .col(string_len_null(Users::City, 40))
                    .col(timestamp(Users::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Course::Table)
                    .if_not_exists()
                    .col(pk_auto(Course::Id))
                    .col(string_len(Course::Title, 255))
                    .col(text(Course::Description).default(""))
                    .col(integer(Course::OwnerId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-course-owner_id")
                            .from(Course::Table, Course::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Section::Table)
                    .if_not_exists()
                    .col(pk_auto(Section::Id))
                    .col(string_len(Section::Title, 255))
                    .col(integer(Section::CourseId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-section-course_id")
                            .from(Section::Table, Section::CourseId)
                            .to(Course::Table, Course::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Material::Table)
                    .if_not_exists()
                    .col(pk_auto(Material::Id))
                    .col(string_len(Material::Title, 255))
                    .col(text(Material::Content))
                    .col(integer(Material::SectionId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-material-section_id")
                            .from(Material::Table, Material::SectionId)
                            .to(Section::Table, Section::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Test::Table)
                    .if_not_exists()
                    .col(pk_auto(Test::Id))
                    .col(string_len(Test::Title, 255))
                    // One test per material.
                    .col(integer(Test::MaterialId).unique_key())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-test-material_id")
                            .from(Test::Table, Test::MaterialId)
                            .to(Material::Table, Material::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Question::Table)
                    .if_not_exists()
                    .col(pk_auto(Question::Id))
                    .col(integer(Question::TestId))
                    .col(text(Question::Text))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-question-test_id")
                            .from(Question::Table, Question::TestId)
                            .to(Test::Table, Test::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Answer::Table)
                    .if_not_exists()
                    .col(pk_auto(Answer::Id))
                    .col(integer(Answer::QuestionId))
                    .col(string_len(Answer::Text, 255))
                    .col(boolean(Answer::IsCorrect).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-answer-question_id")
                            .from(Answer::Table, Answer::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Append-only: no uniqueness on (user, test) so retakes are kept.
        manager
            .create_table(
                Table::create()
                    .table(TestAttempt::Table)
                    .if_not_exists()
                    .col(pk_auto(TestAttempt::Id))
                    .col(integer(TestAttempt::UserId))
                    .col(integer(TestAttempt::TestId))
                    .col(
                        small_integer(TestAttempt::Score)
                            .check(Expr::col(TestAttempt::Score).gte(0))
                            .check(Expr::col(TestAttempt::Score).lte(100)),
                    )
                    .col(boolean(TestAttempt::Passed))
                    .col(timestamp(TestAttempt::SubmittedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-test_attempt-user_id")
                            .from(TestAttempt::Table, TestAttempt::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-test_attempt-test_id")
                            .from(TestAttempt::Table, TestAttempt::TestId)
                            .to(Test::Table, Test::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_course_owner_id")
                    .table(Course::Table)
                    .col(Course::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_section_course_id")
                    .table(Section::Table)
                    .col(Section::CourseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_material_section_id")
                    .table(Material::Table)
                    .col(Material::SectionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_question_test_id")
                    .table(Question::Table)
                    .col(Question::TestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_answer_question_id")
                    .table(Answer::Table)
                    .col(Answer::QuestionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_attempt_user_id")
                    .table(TestAttempt::Table)
                    .col(TestAttempt::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_attempt_test_id")
                    .table(TestAttempt::Table)
                    .col(TestAttempt::TestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_attempt_submitted_at")
                    .table(TestAttempt::Table)
                    .col(TestAttempt::SubmittedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestAttempt::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Answer::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Question::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Test::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Material::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Section::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Course::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Role,
    FirstName,
    LastName,
    City,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Course {
    Table,
    Id,
    Title,
    Description,
    OwnerId,
}

#[derive(DeriveIden)]
enum Section {
    Table,
    Id,
    Title,
    CourseId,
}

#[derive(DeriveIden)]
enum Material {
    Table,
    Id,
    Title,
    Content,
    SectionId,
}

#[derive(DeriveIden)]
enum Test {
    Table,
    Id,
    Title,
    MaterialId,
}

#[derive(DeriveIden)]
enum Question {
    Table,
    Id,
    TestId,
    Text,
}

#[derive(DeriveIden)]
enum Answer {
    Table,
    Id,
    QuestionId,
    Text,
    IsCorrect,
}

#[derive(DeriveIden)]
enum TestAttempt {
    Table,
    Id,
    UserId,
    TestId,
    Score,
    Passed,
    SubmittedAt,
}
