pub mod answer;
pub mod profile;
pub mod question;
pub mod session;
