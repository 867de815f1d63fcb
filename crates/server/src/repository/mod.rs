pub mod attempt_repository;
pub mod course_repository;
pub mod material_repository;
pub mod section_repository;
pub mod test_repository;
pub mod user_repository;

pub use attempt_repository::{
    AttemptRecord, AttemptRepository, NewAttempt, SeaOrmAttemptRepository,
};
pub use course_repository::{
    CourseChanges, CourseRecord, CourseRepository, NewCourse, SeaOrmCourseRepository,
};
pub use material_repository::{
    MaterialChanges, MaterialRecord, MaterialRepository, NewMaterial, SeaOrmMaterialRepository,
};
pub use section_repository::{
    NewSection, SectionChanges, SectionRecord, SectionRepository, SeaOrmSectionRepository,
};
pub use test_repository::{
    AnswerRecord, NewAnswer, NewQuestion, NewTest, QuestionRecord, SeaOrmTestRepository,
    TestChanges, TestRecord, TestRepository,
};
pub use user_repository::{NewUser, SeaOrmUserRepository, UserChanges, UserRecord, UserRepository};
