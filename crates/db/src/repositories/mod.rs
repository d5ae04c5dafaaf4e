//! Database repositories.

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

pub use activity::ActivityRepository;
pub use anime::{AnimeFilter, AnimeRepository, AnimeSort, SyncWrite, SyncedAnime};
pub use character::CharacterRepository;
pub use comment::{CommentRepository, CommentSort, CommentUpsert};
pub use episode::EpisodeRepository;
pub use like::LikeRepository;
pub use person::PersonRepository;
pub use privacy_setting::PrivacySettingRepository;
pub use reply::ReplyRepository;
pub use report::ReportRepository;
pub use sync_log::SyncLogRepository;
pub use user::{SharedWatchUser, UserRepository};
pub use user_ban::UserBanRepository;
pub use user_follow::UserFollowRepository;
pub use user_profile::UserProfileRepository;
pub use watch_status::{SavedStatus, WatchStatusRepository};
