//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod activity;
pub mod anime;
pub mod comment;
pub mod email;
pub mod following;
pub mod like;
pub mod moderation;
pub mod paging;
pub mod person;
pub mod privacy;
pub mod recommendation;
pub mod reply;
pub mod report;
pub mod search;
pub mod sync;
pub mod token;
pub mod verification;
pub mod watch_status;

pub use account::{
    AccountService, AuthResponse, ChangeEmailInput, ChangePasswordInput, LoginInput,
    ProfileResponse, RegisterInput, ResetPasswordInput, UpdateProfileInput, UserSummary,
};
pub use activity::ActivityService;
pub use anime::{
    AnimeDetail, AnimeKind, AnimePage, AnimeService, CreateAnimeInput, CreateCharacterInput,
    CreateEpisodeInput, ListAnimeQuery, UpdateAnimeInput,
};
pub use comment::{
    CommentPage, CommentService, CommentView, EditCommentInput, ListCommentsQuery,
    UpsertCommentInput,
};
pub use email::{EmailService, LogMailer, Mailer, MemoryMailer, SmtpMailer, mailer_from_config};
pub use following::{FollowResult, FollowingService};
pub use like::{LikeInput, LikeOutcome, LikeService};
pub use moderation::{BanUserInput, BannedUsersPage, ModerationService};
pub use paging::PageParams;
pub use person::{CreatePersonInput, PersonService};
pub use privacy::{PrivacyFacet, PrivacyService, PrivacySettings, UpdatePrivacyInput};
pub use recommendation::{
    Recommendation, RecommendationPage, RecommendationQuery, RecommendationService,
    RecommendationSource, UserRecommendationPage,
};
pub use reply::{CreateReplyInput, ReplyPage, ReplyService, ReplyView};
pub use report::{CreateReportInput, HandleReportInput, ReportAction, ReportQuery, ReportService};
pub use search::{SearchQuery, SearchResults, SearchService, SearchType};
pub use sync::{SyncRecord, SyncService};
pub use token::{Claims, TokenPair, TokenService, TokenType};
pub use verification::{CodePurpose, VerificationService};
pub use watch_status::{
    SetWatchStatusInput, WatchStatusService, WatchlistEntry, WatchlistPage, WatchlistQuery,
};
