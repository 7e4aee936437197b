use serde::{Deserialize, Serialize};

/// Marker the backend expects at the end of an ISO-8601 timestamp.
const UTC_MARKER: char = 'Z';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "INCOME"),
            TransactionType::Expense => write!(f, "EXPENSE"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// Transaction record as returned by the backend and kept in the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTransaction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl CachedTransaction {
    /// Build the payload used to replay this record on the backend.
    /// The id is dropped so the backend assigns a fresh one, and the
    /// owner is forced to `user_id`.
    pub fn to_replay(&self, user_id: i64) -> NewTransaction {
        NewTransaction {
            user_id,
            kind: self.kind,
            amount: self.amount,
            description: self.description.clone(),
            category: self.category.clone(),
            date: self.date.as_deref().map(normalize_utc_date),
        }
    }

    /// Signed contribution to the balance
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

/// Create/update payload. Has no id field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Append the UTC marker to a timestamp that lacks one.
pub fn normalize_utc_date(date: &str) -> String {
    if date.ends_with(UTC_MARKER) {
        date.to_string()
    } else {
        format!("{}{}", date, UTC_MARKER)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub expense: f64,
    #[serde(default)]
    pub balance: f64,
}

impl FinancialSummary {
    pub fn from_transactions<'a>(
        transactions: impl IntoIterator<Item = &'a CachedTransaction>,
    ) -> Self {
        let mut summary = Self::default();
        for transaction in transactions {
            match transaction.kind {
                TransactionType::Income => summary.income += transaction.amount,
                TransactionType::Expense => summary.expense += transaction.amount,
            }
        }
        summary.balance = summary.income - summary.expense;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: TransactionType, amount: f64) -> CachedTransaction {
        CachedTransaction {
            id: Some(41),
            user_id: 7,
            kind,
            amount,
            description: Some("Groceries".to_string()),
            category: Some("Food".to_string()),
            date: Some("2024-03-01T12:30:00".to_string()),
        }
    }

    #[test]
    fn test_parse_backend_transaction() {
        let json = r#"{"id": 12, "userId": 7, "type": "EXPENSE", "amount": 42.5,
            "description": "Coffee", "category": "Food", "date": "2024-03-01T08:15:00"}"#;
        let transaction: CachedTransaction =
            serde_json::from_str(json).expect("valid transaction JSON");
        assert_eq!(transaction.id, Some(12));
        assert_eq!(transaction.user_id, 7);
        assert_eq!(transaction.kind, TransactionType::Expense);
        assert_eq!(transaction.category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_replay_strips_id_and_normalizes_date() {
        let replay = sample(TransactionType::Expense, 10.0).to_replay(7);
        assert_eq!(replay.date.as_deref(), Some("2024-03-01T12:30:00Z"));

        let json = serde_json::to_value(&replay).expect("serializable payload");
        assert!(json.get("id").is_none());
        assert_eq!(json["userId"], 7);
        assert_eq!(json["type"], "EXPENSE");
    }

    #[test]
    fn test_normalize_utc_date_keeps_marker() {
        assert_eq!(normalize_utc_date("2024-03-01T12:30:00Z"), "2024-03-01T12:30:00Z");
        assert_eq!(normalize_utc_date("2024-03-01"), "2024-03-01Z");
    }

    #[test]
    fn test_summary_from_transactions() {
        let transactions = vec![
            sample(TransactionType::Income, 1000.0),
            sample(TransactionType::Expense, 250.0),
            sample(TransactionType::Expense, 50.0),
        ];
        let summary = FinancialSummary::from_transactions(&transactions);
        assert_eq!(summary.income, 1000.0);
        assert_eq!(summary.expense, 300.0);
        assert_eq!(summary.balance, 700.0);
    }

    #[test]
    fn test_transaction_type_from_str() {
        assert_eq!("income".parse::<TransactionType>(), Ok(TransactionType::Income));
        assert_eq!(" Expense ".parse::<TransactionType>(), Ok(TransactionType::Expense));
        assert!("transfer".parse::<TransactionType>().is_err());
    }
}
