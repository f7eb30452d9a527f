use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use cartbot_core::parser::{parse_grocery_list_report, ParseReport};
use cartbot_core::session::SessionStore;

use crate::events::InboundMessage;

/// What the router decided to do with one inbound turn.
#[derive(Clone, Debug, PartialEq)]
pub enum RoutedTurn {
    /// A reset keyword: the session was cleared, treat as a fresh start.
    Reset,
    /// The sender sits inside a menu; that menu's handler owns the turn.
    Menu { menu: String, text: String },
    /// The text parsed as a grocery list; hand the items to order placement.
    Order(ParseReport),
    /// No live session and nothing parseable.
    Fresh { text: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("order service failed: {0}")]
    Service(String),
}

/// The collaborator that turns routing decisions into replies: order
/// persistence, menu screens, greeting text. All of that rendering lives
/// outside the engine; this trait is the seam.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn place_order(&self, key: &str, report: &ParseReport) -> Result<String, RouteError>;
    async fn menu_reply(&self, key: &str, menu: &str, text: &str) -> Result<String, RouteError>;
    async fn fresh_session(&self, key: &str, text: &str) -> Result<String, RouteError>;
}

/// Per-turn router: consults the session store first, then falls back to the
/// grocery-list parser.
pub struct MessageRouter<S> {
    store: Arc<SessionStore>,
    service: S,
    reset_keywords: Vec<String>,
}

impl<S> MessageRouter<S>
where
    S: OrderService,
{
    pub fn new(store: Arc<SessionStore>, service: S, reset_keywords: Vec<String>) -> Self {
        Self { store, service, reset_keywords }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Decides the turn without invoking the service. Reading the session
    /// refreshes its activity window, as any successful access does.
    pub fn decide(&self, key: &str, text: &str) -> RoutedTurn {
        if self.is_reset_keyword(text) {
            return RoutedTurn::Reset;
        }

        if let Some(state) = self.store.get_state(key) {
            return RoutedTurn::Menu { menu: state.current_menu, text: text.to_owned() };
        }

        let report = parse_grocery_list_report(text);
        if report.items.is_empty() {
            // Nothing usable, whether the user typed nothing or nothing
            // parseable; greet rather than pretend an empty order arrived.
            return RoutedTurn::Fresh { text: text.to_owned() };
        }
        RoutedTurn::Order(report)
    }

    /// Routes one inbound message end to end and returns the service's
    /// reply text.
    pub async fn route(&self, message: &InboundMessage) -> Result<String, RouteError> {
        let key = message.owner_key();
        let text = message.text.trim();

        match self.decide(&key, text) {
            RoutedTurn::Reset => {
                self.store.clear_state(&key);
                debug!(
                    event_name = "chat.route.session_reset",
                    owner_key = %key,
                    "session reset by keyword"
                );
                self.service.fresh_session(&key, text).await
            }
            RoutedTurn::Menu { menu, text } => {
                debug!(
                    event_name = "chat.route.menu_turn",
                    owner_key = %key,
                    menu = %menu,
                    "routing turn to live menu"
                );
                self.service.menu_reply(&key, &menu, &text).await
            }
            RoutedTurn::Order(report) => {
                debug!(
                    event_name = "chat.route.order_parsed",
                    owner_key = %key,
                    items = report.items.len(),
                    rejected = report.rejected.len(),
                    "parsed grocery list from free text"
                );
                self.service.place_order(&key, &report).await
            }
            RoutedTurn::Fresh { text } => self.service.fresh_session(&key, &text).await,
        }
    }

    fn is_reset_keyword(&self, text: &str) -> bool {
        self.reset_keywords.iter().any(|keyword| keyword.eq_ignore_ascii_case(text))
    }
}

/// Placeholder service used for wiring and tests; replies describe the
/// decision instead of rendering storefront copy.
#[derive(Default)]
pub struct NoopOrderService;

#[async_trait]
impl OrderService for NoopOrderService {
    async fn place_order(&self, _key: &str, report: &ParseReport) -> Result<String, RouteError> {
        Ok(format!(
            "order received: {} item(s), {} fragment(s) not understood",
            report.items.len(),
            report.rejected.len()
        ))
    }

    async fn menu_reply(&self, _key: &str, menu: &str, _text: &str) -> Result<String, RouteError> {
        Ok(format!("reply recorded for menu `{menu}`"))
    }

    async fn fresh_session(&self, _key: &str, _text: &str) -> Result<String, RouteError> {
        Ok("welcome! send a grocery list to begin an order".to_owned())
    }
}
