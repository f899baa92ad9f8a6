//! Typed facades consumed by UI screens.
//!
//! Checkout pickers and the address-book / card-management screens talk to
//! these services rather than to the generic registry directly.

pub mod address_book;
pub mod wallet;

pub use address_book::AddressBook;
pub use wallet::PaymentWallet;
