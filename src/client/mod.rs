//! Terminal client: talks to the service over HTTP and keeps answered questions as tabs.

pub mod command;
pub mod http;
pub mod session;

pub use command::ChatCommand;
pub use http::{ClientError, RagClient, UploadReceipt, validate_pdf};
pub use session::{
    OVERFLOW_PAGE_SIZE, OverflowPage, QueryTab, TabId, TabLayout, TabSession, max_visible_tabs,
};
