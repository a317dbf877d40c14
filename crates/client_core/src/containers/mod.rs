//! Containers bind page interactions to store calls and navigation.

pub mod bills;
pub mod new_bill;

pub use bills::{BillRow, Bills};
pub use new_bill::{
    FileSelection, InvalidFileExtension, InvalidNumber, NewBill, NewBillError, NewBillForm, SelectedFile,
    SubmissionState,
};
