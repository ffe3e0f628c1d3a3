pub mod chat;
pub mod cms;
pub mod crm;
