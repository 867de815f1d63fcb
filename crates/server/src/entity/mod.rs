pub mod answer;
pub mod course;
pub mod material;
pub mod question;
pub mod section;
pub mod test_attempt;
pub mod user;
