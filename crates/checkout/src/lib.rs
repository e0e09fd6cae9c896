//! Order submission coordination and payment flows.
//!
//! This crate turns a cart snapshot into a durable order through a fixed
//! write sequence:
//! 1. Validate the snapshot and customer fields
//! 2. Create the order header
//! 3. Insert all line items in one write
//! 4. Decrement inventory per line, sequentially
//!
//! Each step depends on the identifier produced by the one before it, so
//! there is no parallel fan-out. A failure after the header exists is
//! surfaced as a partial write naming the phase that broke; already-applied
//! steps are not rolled back in this path.
//!
//! Payment leaves the process entirely: the user finishes payment on a
//! gateway page and returns via a deep link. The redirect handler bridges
//! that gap with a persisted pending-order marker that is cleared on every
//! exit path.

pub mod coordinator;
pub mod customer;
pub mod error;
pub mod gateway;
pub mod phase;
pub mod receipt;
pub mod redirect;

pub use coordinator::{CancellationOutcome, CheckoutCoordinator};
pub use customer::CustomerInfo;
pub use error::CheckoutError;
pub use gateway::{
    BrokeredGateway, HostedCheckoutGateway, InMemoryGateway, PaymentGateway, PaymentRequest,
};
pub use phase::CheckoutPhase;
pub use receipt::CheckoutReceipt;
pub use redirect::{PaymentRedirectHandler, RedirectOutcome, RedirectResolution};
