pub mod profile_dto;
pub mod session_dto;
