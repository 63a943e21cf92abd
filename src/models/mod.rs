pub mod comment;
pub mod employee;
pub mod news;
pub mod performance;
pub mod section;
pub mod user;

pub use comment::Comment;
pub use employee::Employee;
pub use news::NewsArticle;
pub use performance::Performance;
pub use section::TicketSection;
pub use user::User;
