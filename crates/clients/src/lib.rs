//! Thin clients for the SaaS APIs the hub reaches over HTTP.
//!
//! Each module wraps one vendor: it builds requests, maps vendor status
//! codes onto [`ClientError`], and decodes only the parts of the response
//! the hub inspects. The CRM is reached through the [`CrmRepository`]
//! seam so chat flows and tools can run against [`InMemoryCrm`] in tests.

pub mod airtable;
pub mod crm;
pub mod error;
pub mod firefly;
pub mod gong;
pub mod http;
pub mod memory;
pub mod salesforce;
pub mod tavily;
pub mod trends;
pub mod wordpress;
pub mod writer;

pub use airtable::{AirtableClient, AirtableRecord};
pub use crm::{account_snapshot, CrmRepository};
pub use error::ClientError;
pub use firefly::FireflyClient;
pub use gong::{CallTranscript, GongClient};
pub use http::build_http_client;
pub use memory::InMemoryCrm;
pub use salesforce::SalesforceClient;
pub use tavily::TavilyClient;
pub use trends::{TrendsClient, TrendsDataType, TrendsQuery};
pub use wordpress::WordPressClient;
pub use writer::WriterClient;
