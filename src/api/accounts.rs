use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_with::{serde_as, DefaultOnError, VecSkipError};

use crate::api::base::Result;
use crate::client::MonarchMoney;

pub const UNKNOWN: &str = "Unknown";

pub const GET_ACCOUNTS_QUERY: &str = r#"
query GetAccounts {
  accounts {
    id
    displayName
    currentBalance
    isAsset
    isHidden
    includeInNetWorth
    mask
    updatedAt
    type {
      name
      display
    }
    subtype {
      name
      display
    }
    institution {
      id
      name
    }
  }
}
"#;

impl MonarchMoney {
    pub async fn get_accounts(&self) -> Result<Vec<AccountRecord>> {
        let data: AccountsData = self
            .graphql("GetAccounts", GET_ACCOUNTS_QUERY, serde_json::json!({}))
            .await?;
        Ok(data.accounts)
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct AccountsData {
    #[serde_as(as = "VecSkipError<_>")]
    pub accounts: Vec<AccountRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountType {
    pub name: Option<String>,
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Institution {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub current_balance: Option<Decimal>,
    #[serde(default)]
    pub is_asset: Option<bool>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
    #[serde(default)]
    pub include_in_net_worth: Option<bool>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default, rename = "type")]
    pub account_type: Option<AccountType>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub subtype: Option<AccountType>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub institution: Option<Institution>,
}

impl AccountRecord {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(UNKNOWN)
    }

    /// Current balance, zero when the service left it out.
    pub fn balance(&self) -> Decimal {
        self.current_balance.unwrap_or(Decimal::ZERO)
    }

    /// Two decimal places, halves rounded away from zero on the exact decimal
    /// value. `2.675` prints `2.68`, unlike float formatting which gives `2.67`.
    pub fn formatted_balance(&self) -> String {
        let mut balance = self
            .balance()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if balance.is_zero() {
            balance.set_sign_positive(true);
        }
        balance.rescale(2);
        balance.to_string()
    }

    pub fn type_name(&self) -> &str {
        self.account_type
            .as_ref()
            .and_then(|t| t.name.as_deref())
            .unwrap_or(UNKNOWN)
    }
}

// Balances arrive as JSON numbers, occasionally as strings; anything else is treated as absent.
fn lenient_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let text = match raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        _ => return Ok(None),
    };
    Ok(Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok())
}
