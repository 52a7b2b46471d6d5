use crate::model::{Price, Store};
use chrono::NaiveDate;

/// The ledger's date format, e.g. `2024-03-09`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One purchase, as appended to the ledger.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Expense {
    date: NaiveDate,
    location: String,
    name: String,
    category: String,
    price: Price,
}

impl Expense {
    /// Creates a record of a purchase at `store` on `date`.
    pub fn new(date: NaiveDate, store: &Store, price: Price) -> Self {
        Self {
            date,
            location: store.location().to_string(),
            name: store.name().to_string(),
            category: store.category().to_string(),
            price,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The ledger row: `[date, location, name, category, price]`.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.format(DATE_FORMAT).to_string(),
            self.location.clone(),
            self.name.clone(),
            self.category.clone(),
            self.price.value().to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_to_row() {
        let store = Store::new("TT", "North Vancouver", "T&T Supermarket", "food");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let expense = Expense::new(date, &store, Price::from_str("12.50").unwrap());
        assert_eq!(
            expense.to_row(),
            vec![
                "2024-03-09",
                "North Vancouver",
                "T&T Supermarket",
                "food",
                "12.50"
            ]
        );
    }
}
