mod auth;
pub use auth::Auth;

mod dashboard;
pub use dashboard::Dashboard;
