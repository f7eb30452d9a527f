pub mod config;
pub mod parser;
pub mod session;
pub mod units;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use parser::{
    parse_grocery_list, parse_grocery_list_report, parse_item, ItemPattern, ParseReport, ParsedItem,
};
pub use session::{
    Clock, ConversationState, ManualClock, SessionStore, SessionSweeper, SweeperHandle,
    SystemClock, MAIN_MENU,
};
pub use units::{convert_to_base_unit, normalize_unit, unit_token, CanonicalUnit};
