//! Domain model for the self-study platform: identities, roles, the
//! access policy and the test grading engine.

pub mod domain;
