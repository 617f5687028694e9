pub mod question;
pub mod response;
pub mod resume;
pub mod session;
