use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DomainError;

pub const DEFAULT_TASK_STATUS: &str = "Not Started";
const MISSING: &str = "n/a";

/// A Salesforce record id. Ids are interpolated into SOQL, so only the
/// 15 and 18 character alphanumeric forms are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let valid_length = matches!(trimmed.len(), 15 | 18);
        if valid_length && trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(DomainError::InvalidAccountId(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMatch {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Industry", default)]
    pub industry: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "StageName", default)]
    pub stage_name: Option<String>,
    #[serde(rename = "Amount", default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Subject", default)]
    pub subject: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Subject", default)]
    pub subject: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "ActivityDate", default)]
    pub activity_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTask {
    pub account_id: AccountId,
    pub subject: String,
    pub status: String,
    pub activity_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(account_id: AccountId, subject: impl Into<String>) -> Self {
        Self {
            account_id,
            subject: subject.into(),
            status: DEFAULT_TASK_STATUS.to_owned(),
            activity_date: None,
        }
    }

    pub fn with_activity_date(mut self, raw: Option<&str>) -> Result<Self, DomainError> {
        self.activity_date = match raw.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => Some(
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| DomainError::InvalidDate(value.to_owned()))?,
            ),
            None => None,
        };
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.subject.trim().is_empty() {
            return Err(DomainError::InvariantViolation("task subject is required".to_owned()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNote {
    pub account_id: AccountId,
    pub title: String,
    pub body: String,
}

impl NewNote {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvariantViolation("note title is required".to_owned()));
        }
        Ok(())
    }
}

/// Result of an sobject create call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<Value>,
}

fn default_success() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub details: Map<String, Value>,
    pub contacts: Vec<Contact>,
    pub cases: Vec<Case>,
    pub opportunities: Vec<Opportunity>,
    pub activities: Vec<Task>,
}

impl AccountSnapshot {
    /// Plain-text rendering handed to the language model and to operators.
    pub fn render_summary(&self) -> String {
        let mut summary = String::from("Account Data from Salesforce\n\nAccount Details:\n");

        let mut fields: Vec<(&String, &Value)> =
            self.details.iter().filter(|(key, _)| key.as_str() != "attributes").collect();
        fields.sort_by(|left, right| left.0.cmp(right.0));
        let details: Vec<String> =
            fields.into_iter().map(|(key, value)| format!("{key}: {}", render_value(value))).collect();
        summary.push_str(&details.join("\n"));

        summary.push_str("\n\nContacts:\n");
        let contacts: Vec<String> = self
            .contacts
            .iter()
            .map(|contact| {
                format!("Name: {}, Email: {}", text(&contact.name), text(&contact.email))
            })
            .collect();
        summary.push_str(&contacts.join("\n"));

        summary.push_str("\n\nCases:\n");
        let cases: Vec<String> = self
            .cases
            .iter()
            .map(|case| format!("Subject: {}, Status: {}", text(&case.subject), text(&case.status)))
            .collect();
        summary.push_str(&cases.join("\n"));

        summary.push_str("\n\nOpportunities:\n");
        let opportunities: Vec<String> = self
            .opportunities
            .iter()
            .map(|opportunity| {
                let amount = opportunity
                    .amount
                    .map(|amount| amount.normalize().to_string())
                    .unwrap_or_else(|| MISSING.to_owned());
                format!(
                    "Name: {}, Stage: {}, Amount: {amount}",
                    text(&opportunity.name),
                    text(&opportunity.stage_name)
                )
            })
            .collect();
        summary.push_str(&opportunities.join("\n"));

        summary.push_str("\n\nActivities:\n");
        let activities: Vec<String> = self
            .activities
            .iter()
            .map(|task| {
                let date = task
                    .activity_date
                    .map(|date| date.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| MISSING.to_owned());
                format!(
                    "Subject: {}, Status: {}, Date: {date}",
                    text(&task.subject),
                    text(&task.status)
                )
            })
            .collect();
        summary.push_str(&activities.join("\n"));

        summary
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => MISSING.to_owned(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::{json, Map, Value};

    use super::{AccountId, AccountSnapshot, Case, Contact, NewTask, Opportunity, Task};
    use crate::errors::DomainError;

    fn account_id() -> AccountId {
        AccountId::parse("001000000000001AAA").expect("valid id")
    }

    #[test]
    fn account_id_accepts_salesforce_id_forms_only() {
        assert!(AccountId::parse("001000000000001").is_ok());
        assert!(AccountId::parse(" 001000000000001AAA ").is_ok());
        assert_eq!(
            AccountId::parse("001' OR Name != '"),
            Err(DomainError::InvalidAccountId("001' OR Name != '".to_owned()))
        );
        assert!(AccountId::parse("0010000000").is_err());
    }

    #[test]
    fn new_task_defaults_status_and_parses_dates() {
        let task = NewTask::new(account_id(), "Follow up")
            .with_activity_date(Some("2024-03-01"))
            .expect("valid date");
        assert_eq!(task.status, "Not Started");
        assert_eq!(task.activity_date, NaiveDate::from_ymd_opt(2024, 3, 1));

        let error = NewTask::new(account_id(), "Follow up").with_activity_date(Some("03/01/2024"));
        assert_eq!(error, Err(DomainError::InvalidDate("03/01/2024".to_owned())));
    }

    #[test]
    fn summary_lists_every_section_in_order() {
        let mut details = Map::new();
        details.insert("attributes".to_owned(), json!({"type": "Account"}));
        details.insert("Name".to_owned(), json!("Acme"));
        details.insert("Industry".to_owned(), Value::Null);
        details.insert("NumberOfEmployees".to_owned(), json!(250));

        let snapshot = AccountSnapshot {
            account_id: account_id(),
            details,
            contacts: vec![Contact {
                id: "003".to_owned(),
                name: Some("Ada Lovelace".to_owned()),
                email: Some("ada@acme.test".to_owned()),
            }],
            cases: vec![Case {
                id: "500".to_owned(),
                subject: Some("Login issue".to_owned()),
                status: Some("New".to_owned()),
            }],
            opportunities: vec![Opportunity {
                id: "006".to_owned(),
                name: Some("Renewal".to_owned()),
                stage_name: Some("Prospecting".to_owned()),
                amount: Some(Decimal::new(1250050, 2)),
            }],
            activities: vec![Task {
                id: "00T".to_owned(),
                subject: Some("Call".to_owned()),
                status: None,
                activity_date: None,
            }],
        };

        let expected = "Account Data from Salesforce\n\nAccount Details:\n\
Industry: n/a\nName: Acme\nNumberOfEmployees: 250\n\n\
Contacts:\nName: Ada Lovelace, Email: ada@acme.test\n\n\
Cases:\nSubject: Login issue, Status: New\n\n\
Opportunities:\nName: Renewal, Stage: Prospecting, Amount: 12500.5\n\n\
Activities:\nSubject: Call, Status: n/a, Date: n/a";
        assert_eq!(snapshot.render_summary(), expected);
    }

    #[test]
    fn records_decode_from_salesforce_field_names() {
        let opportunity: Opportunity = serde_json::from_value(json!({
            "attributes": {"type": "Opportunity"},
            "Id": "006",
            "Name": "Renewal",
            "StageName": "Closed Won",
            "Amount": 1000.0
        }))
        .expect("opportunity decodes");
        assert_eq!(opportunity.amount, Some(Decimal::new(1000, 0)));

        let task: Task = serde_json::from_value(json!({
            "Id": "00T",
            "Subject": "Email",
            "Status": "Completed",
            "ActivityDate": "2024-05-02"
        }))
        .expect("task decodes");
        assert_eq!(task.activity_date, NaiveDate::from_ymd_opt(2024, 5, 2));
    }
}
