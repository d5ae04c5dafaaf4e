//! Database entities.

pub mod activity;
pub mod anime;
pub mod character;
pub mod comment;
pub mod episode;
pub mod like;
pub mod person;
pub mod privacy_setting;
pub mod reply;
pub mod report;
pub mod sync_log;
pub mod user;
pub mod user_ban;
pub mod user_follow;
pub mod user_profile;
pub mod watch_status;

pub use activity::Entity as Activity;
pub use anime::Entity as Anime;
pub use character::Entity as Character;
pub use comment::Entity as Comment;
pub use episode::Entity as Episode;
pub use like::Entity as Like;
pub use person::Entity as Person;
pub use privacy_setting::Entity as PrivacySetting;
pub use reply::Entity as Reply;
pub use report::Entity as Report;
pub use sync_log::Entity as SyncLog;
pub use user::Entity as User;
pub use user_ban::Entity as UserBan;
pub use user_follow::Entity as UserFollow;
pub use user_profile::Entity as UserProfile;
pub use watch_status::Entity as WatchStatus;
