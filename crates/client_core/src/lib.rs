pub mod config;
pub mod containers;
pub mod dom;
pub mod format;
pub mod router;
pub mod session;
pub mod store;
pub mod views;

pub use containers::{
    BillRow, Bills, FileSelection, NewBill, NewBillError, NewBillForm, SelectedFile,
    SubmissionState,
};
pub use dom::{Element, Icon, MemoryRoot, ViewRoot};
pub use router::{MountedView, NavigationEvent, Navigator, Route, Router, RouterError};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use store::{BillStore, HttpBillStore, InMemoryBillStore};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod router_tests;

#[cfg(test)]
#[path = "tests/bills_tests.rs"]
mod bills_tests;

#[cfg(test)]
#[path = "tests/new_bill_tests.rs"]
mod new_bill_tests;

#[cfg(test)]
#[path = "tests/http_store_tests.rs"]
mod http_store_tests;
