pub mod moderation;
pub mod reviews;

pub use moderation::{GeminiModeration, ModerationVerdict, ReviewModeration};
pub use reviews::ReviewService;
