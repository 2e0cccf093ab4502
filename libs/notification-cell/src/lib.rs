pub mod services;

pub use services::mailer::NotificationService;
