use serde::Deserialize;

use crate::api::accounts::UNKNOWN;
use crate::api::base::Result;
use crate::client::MonarchMoney;

pub const GET_ME_QUERY: &str = r#"
query Common_GetMe {
  me {
    id
    email
    name
    timezone
  }
}
"#;

impl MonarchMoney {
    pub async fn get_me(&self) -> Result<Profile> {
        let data: MeData = self
            .graphql("Common_GetMe", GET_ME_QUERY, serde_json::json!({}))
            .await?;
        Ok(data.me)
    }
}

#[derive(Debug, Deserialize)]
pub struct MeData {
    pub me: Profile,
}

/// The authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Profile {
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN)
    }
}
