pub mod ai_service;
pub mod eval_service;
pub mod interview_store;
pub mod profile_service;
pub mod question_service;
pub mod session_service;
pub mod summary_service;
