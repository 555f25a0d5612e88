//! Form-handler logic shared by the HTML pages and the JSON API.

pub mod accounts;
pub mod overview;
pub mod sections;

pub use accounts::{NewAccount, create_account, delete_account};
pub use overview::{Overview, load_overview};
pub use sections::create_section;
