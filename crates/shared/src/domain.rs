use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(BillId);

/// ISO calendar date layout used by every bill on the wire.
pub const BILL_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    Employee,
    Admin,
}

/// The signed-in user as persisted under the `"user"` key of the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "type")]
    pub user_type: UserType,
    #[serde(default)]
    pub email: String,
}

impl Session {
    pub fn employee(email: impl Into<String>) -> Self {
        Self {
            user_type: UserType::Employee,
            email: email.into(),
        }
    }

    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            user_type: UserType::Admin,
            email: email.into(),
        }
    }

    pub fn is_employee(&self) -> bool {
        self.user_type == UserType::Employee
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Pending,
    Accepted,
    Refused,
}

impl BillStatus {
    pub const ALL: [BillStatus; 3] = [Self::Pending, Self::Accepted, Self::Refused];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Refused => "refused",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: BillId,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "type")]
    pub expense_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    /// Kept verbatim; missing or `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default)]
    pub vat: String,
    #[serde(default)]
    pub pct: u32,
    #[serde(default)]
    pub commentary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_admin: Option<String>,
    #[serde(default)]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub status: BillStatus,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Bill {
    /// `None` when the stored date is not an ISO calendar date.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, BILL_DATE_FORMAT).ok()
    }
}
