//! The command router: turns the text of one chat message into a ledger action and a reply.
//!
//! Messages are classified by an ordered list of routes. Each route pairs a matcher with an action
//! and the first route that matches wins:
//! - one route per store, in table order, matching when the message starts with the store's
//!   shortcut (case-sensitive)
//! - `total`, matching the whole message case-insensitively
//! - `help`, matching the whole message case-insensitively
//!
//! Anything else gets `I don't understand`.

use crate::api::Ledger;
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{Expense, Price, Store, Stores};
use crate::Result;
use anyhow::Context;
use chrono::{Local, NaiveDate};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Reply to a message that was logged to the ledger.
pub const DONE: &str = "done";

/// Reply to a message that matched nothing.
pub const NOT_UNDERSTOOD: &str = "I don't understand";

/// Reply to a message that matched a store but whose price could not be parsed.
pub const CANNOT_PROCESS: &str = "I can't process that";

/// Reply when the ledger could not be reached.
pub const DEPENDENCY_FAILED: &str = "Something went wrong, please try again";

/// The ledger column that holds prices.
const PRICE_COLUMN: &str = "E";

/// Where today's date comes from.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The machine's local date.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// What a message asks the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Log a purchase at this store.
    Record(&'a Store),
    /// Report the sum of the ledger's price column.
    Total,
    /// List the store shortcuts.
    Help,
    /// Nothing matched.
    Unknown,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// The store's shortcut is a case-sensitive prefix of the raw message.
    Shortcut(Store),
    /// Case-insensitive match of the whole, trimmed message.
    Keyword(&'static str),
}

impl Matcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Shortcut(store) => store.matches(text),
            Matcher::Keyword(keyword) => text.trim().to_lowercase() == *keyword,
        }
    }
}

#[derive(Debug, Clone)]
enum Action {
    Record(Store),
    Total,
    Help,
}

#[derive(Debug, Clone)]
struct Route {
    matcher: Matcher,
    action: Action,
}

/// Classifies chat messages and carries them out against the ledger.
pub struct Router {
    stores: Stores,
    routes: Vec<Route>,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
}

impl Router {
    /// Creates a router for `stores` that uses the local date for new records.
    pub fn new(stores: Stores, ledger: Arc<dyn Ledger>) -> Self {
        Self::with_clock(stores, ledger, Arc::new(LocalClock))
    }

    pub fn with_clock(stores: Stores, ledger: Arc<dyn Ledger>, clock: Arc<dyn Clock>) -> Self {
        let mut routes: Vec<Route> = stores
            .iter()
            .map(|store| Route {
                matcher: Matcher::Shortcut(store.clone()),
                action: Action::Record(store.clone()),
            })
            .collect();
        routes.push(Route {
            matcher: Matcher::Keyword("total"),
            action: Action::Total,
        });
        routes.push(Route {
            matcher: Matcher::Keyword("help"),
            action: Action::Help,
        });
        Self {
            stores,
            routes,
            ledger,
            clock,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Finds the first route that matches `text`.
    pub fn classify(&self, text: &str) -> Command<'_> {
        let action = self
            .routes
            .iter()
            .find(|route| route.matcher.matches(text))
            .map(|route| &route.action);
        match action {
            Some(Action::Record(store)) => Command::Record(store),
            Some(Action::Total) => Command::Total,
            Some(Action::Help) => Command::Help,
            None => Command::Unknown,
        }
    }

    /// Handles one message and returns the reply text.
    ///
    /// # Errors
    /// - `ErrorType::Request` if the message matched a store but its price is malformed
    /// - `ErrorType::Dependency` if the ledger call failed or the ledger holds a non-numeric price
    pub async fn handle(&self, text: &str) -> Result<String> {
        self.handle_on(text, self.clock.today()).await
    }

    /// Same as `handle`, with an explicit date for new records.
    pub async fn handle_on(&self, text: &str, date: NaiveDate) -> Result<String> {
        let command = self.classify(text);
        debug!("'{text}' classified as {command:?}");
        match command {
            Command::Record(store) => {
                let price = parse_price(text).pub_result(ErrorType::Request)?;
                let expense = Expense::new(date, store, price);
                self.ledger
                    .append(expense.to_row())
                    .await
                    .context("Unable to append the expense to the ledger")
                    .pub_result(ErrorType::Dependency)?;
                info!(
                    "Recorded {} at {} ({}) on {}",
                    price,
                    store.name(),
                    store.category(),
                    expense.date()
                );
                Ok(DONE.to_string())
            }
            Command::Total => {
                let total = self.total().await.pub_result(ErrorType::Dependency)?;
                info!("Ledger total is {total}");
                Ok(total.to_string())
            }
            Command::Help => Ok(self.help()),
            Command::Unknown => Ok(NOT_UNDERSTOOD.to_string()),
        }
    }

    /// One `<shortcut>: <name>` line per store, in table order.
    pub fn help(&self) -> String {
        self.stores
            .iter()
            .map(|store| format!("{}: {}", store.shortcut(), store.name()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Sums the ledger's price column. Empty cells are skipped.
    async fn total(&self) -> Res<Price> {
        let cells = self
            .ledger
            .column(PRICE_COLUMN)
            .await
            .context("Unable to read the price column from the ledger")?;
        let mut total = Price::ZERO;
        for (i, cell) in cells.iter().enumerate() {
            if cell.trim().is_empty() {
                continue;
            }
            let price = Price::from_str(cell).with_context(|| {
                format!("Ledger row {} has a price that is not a number: '{cell}'", i + 1)
            })?;
            total = total
                .checked_add(price)
                .with_context(|| format!("The ledger total overflowed at row {}", i + 1))?;
        }
        Ok(total)
    }
}

/// The price is the last whitespace-separated token. A message with a single token has a price of
/// zero.
fn parse_price(text: &str) -> Res<Price> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [] | [_] => Ok(Price::ZERO),
        [.., last] => {
            Price::from_str(last).with_context(|| format!("'{last}' is not a valid price"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestLedger;

    struct FixedClock(NaiveDate);

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn router_with(rows: Vec<Vec<String>>) -> (Router, Arc<TestLedger>) {
        let ledger = Arc::new(TestLedger::with_rows("Sheet1", rows));
        let router = Router::with_clock(
            Stores::default(),
            ledger.clone(),
            Arc::new(FixedClock(date())),
        );
        (router, ledger)
    }

    fn price_rows(prices: &[&str]) -> Vec<Vec<String>> {
        prices
            .iter()
            .map(|p| {
                vec![
                    "2024-01-01".to_string(),
                    "l".to_string(),
                    "n".to_string(),
                    "c".to_string(),
                    p.to_string(),
                ]
            })
            .collect()
    }

    #[tokio::test]
    async fn test_every_store_records_price_and_category() {
        let (router, ledger) = router_with(Vec::new());
        let stores: Vec<Store> = router.stores().iter().cloned().collect();
        for store in &stores {
            let reply = router
                .handle(&format!("{} 12.50", store.shortcut()))
                .await
                .unwrap();
            assert_eq!(reply, DONE);
        }

        let rows = ledger.rows().await;
        assert_eq!(rows.len(), stores.len());
        for (row, store) in rows.iter().zip(stores.iter()) {
            assert_eq!(
                row,
                &vec![
                    "2024-03-09".to_string(),
                    store.location().to_string(),
                    store.name().to_string(),
                    store.category().to_string(),
                    "12.50".to_string(),
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_shortcut_without_price_is_zero() {
        let (router, ledger) = router_with(Vec::new());
        assert_eq!(router.handle("SF").await.unwrap(), DONE);
        assert_eq!(ledger.rows().await[0][4], "0");
    }

    #[tokio::test]
    async fn test_malformed_price_is_a_request_error() {
        let (router, ledger) = router_with(Vec::new());
        let err = router.handle("SF twelve").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
        assert!(err.to_string().contains("'twelve' is not a valid price"));

        let err = router.handle("SF -4").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
        assert!(ledger.rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_total_in_any_case() {
        let (router, ledger) = router_with(price_rows(&["3", "4.5", "10.25"]));
        assert_eq!(router.handle("total").await.unwrap(), "17.75");
        assert_eq!(router.handle("TOTAL").await.unwrap(), "17.75");
        assert_eq!(router.handle(" Total ").await.unwrap(), "17.75");
        assert_eq!(ledger.rows().await.len(), 3);
    }

    #[tokio::test]
    async fn test_total_of_empty_ledger() {
        let (router, _) = router_with(Vec::new());
        assert_eq!(router.handle("total").await.unwrap(), "0.00");
    }

    #[tokio::test]
    async fn test_total_skips_blank_and_formatted_cells() {
        let (router, _) = router_with(price_rows(&["$1,000.10", "", "2"]));
        assert_eq!(router.handle("total").await.unwrap(), "1002.10");
    }

    #[tokio::test]
    async fn test_total_with_bad_cell_is_a_dependency_error() {
        let (router, _) = router_with(price_rows(&["3", "price"]));
        let err = router.handle("total").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Dependency);
        assert!(err.to_string().contains("Ledger row 2"));
    }

    #[tokio::test]
    async fn test_total_overflow_is_a_dependency_error() {
        let (router, ledger) = router_with(Vec::new());
        assert_eq!(
            router.handle("SF 79228162514264337593543950335").await.unwrap(),
            DONE
        );
        assert_eq!(router.handle("SF 1").await.unwrap(), DONE);
        assert_eq!(ledger.rows().await.len(), 2);

        let err = router.handle("total").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Dependency);
        assert!(err.to_string().contains("overflowed at row 2"));
    }

    #[tokio::test]
    async fn test_help_lists_stores_in_order() {
        let (router, _) = router_with(Vec::new());
        assert_eq!(
            router.handle("HELP").await.unwrap(),
            "P: Persia Foods\nTW: Taiwan\nSF: Save on Foods\nTT: T&T Supermarket\nSP: Shoppers"
        );
    }

    #[tokio::test]
    async fn test_unknown_does_not_touch_ledger() {
        let (router, ledger) = router_with(Vec::new());
        assert_eq!(router.handle("xyz").await.unwrap(), NOT_UNDERSTOOD);
        assert_eq!(router.handle("what is this").await.unwrap(), NOT_UNDERSTOOD);
        assert_eq!(router.handle("").await.unwrap(), NOT_UNDERSTOOD);
        assert!(ledger.rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_shortcuts_are_case_sensitive() {
        let (router, ledger) = router_with(Vec::new());
        assert_eq!(router.classify("sp 5"), Command::Unknown);
        assert_eq!(router.classify(" SP 5"), Command::Unknown);
        match router.classify("SPX") {
            Command::Record(store) => assert_eq!(store.name(), "Shoppers"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(router.handle("sp 5").await.unwrap(), NOT_UNDERSTOOD);
        assert!(ledger.rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_replay_appends_twice() {
        let (router, ledger) = router_with(Vec::new());
        router.handle("TT 8").await.unwrap();
        router.handle("TT 8").await.unwrap();
        let rows = ledger.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], rows[1]);
    }

    #[test]
    fn test_classify_order() {
        let (router, _) = router_with(Vec::new());
        match router.classify("TW 9") {
            Command::Record(store) => assert_eq!(store.name(), "Taiwan"),
            other => panic!("unexpected {other:?}"),
        }
        // Keywords only match the whole message.
        assert_eq!(router.classify("total please"), Command::Unknown);
        assert_eq!(router.classify("help"), Command::Help);
        // "P" is a store shortcut, so a message starting with "P" never reaches the keywords.
        assert!(matches!(router.classify("Plenty"), Command::Record(_)));
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("SF 12.50").unwrap().to_string(), "12.50");
        assert_eq!(parse_price("SF lunch with bob 7").unwrap().to_string(), "7.00");
        assert!(parse_price("SF").unwrap().is_zero());
        assert!(parse_price("SF 1 x").is_err());
    }
}
