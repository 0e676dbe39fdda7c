//! Built-in rule catalog

mod activity_log;
mod allowed_methods;
mod media_type;
mod parsing_error;
mod path_masquerade;

pub use activity_log::ActivityLog;
pub use allowed_methods::AllowedMethods;
pub use media_type::{MediaType, MEDIA_RANGE_PATTERN, MIME_TYPE_PATTERN};
pub use parsing_error::ParsingError;
pub use path_masquerade::PathMasquerading;

use crate::rule::RuleSpec;

pub const PARSING_ERROR_KEY: &str = "parsing-error";
pub const ALLOWED_METHODS_KEY: &str = "allowed-methods";
pub const ACTIVITY_LOG_KEY: &str = "activity-log";
pub const MEDIA_TYPE_KEY: &str = "media-type";
pub const PATH_MASQUERADING_KEY: &str = "path-masquerading";

/// Every built-in rule, in reporting order
pub fn builtin_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec {
            key: PARSING_ERROR_KEY,
            factory: || Box::new(ParsingError),
        },
        RuleSpec {
            key: ALLOWED_METHODS_KEY,
            factory: || Box::new(AllowedMethods::default()),
        },
        RuleSpec {
            key: ACTIVITY_LOG_KEY,
            factory: || Box::new(ActivityLog),
        },
        RuleSpec {
            key: MEDIA_TYPE_KEY,
            factory: || Box::new(MediaType),
        },
        RuleSpec {
            key: PATH_MASQUERADING_KEY,
            factory: || Box::new(PathMasquerading),
        },
    ]
}
