mod auth_page;
pub use auth_page::AuthPageView;

mod dashboard;
pub use dashboard::DashboardView;
