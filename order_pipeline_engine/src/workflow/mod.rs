//! # Order workflow
//!
//! [`OrderWorkflow::process_order`] takes a raw order payload through the business stages, one after the other:
//!
//! 1. create the order (`NEW`), before anything is validated,
//! 2. validate the payload,
//! 3. move to `PROCESSING`,
//! 4. check inventory,
//! 5. charge the payment,
//! 6. move to `PAYMENT_COMPLETED`,
//! 7. move to `SHIPPED`,
//! 8. notify the customer (best effort).
//!
//! Every status change is persisted before the next stage starts. A failure in stages 2 to 7 moves the order to
//! `FAILED` with the reason as its error message, and the error is returned to the caller.
mod errors;
mod order_workflow;
mod services;
mod validation;

pub use errors::{FailureReason, WorkflowError};
pub use order_workflow::{OrderWorkflow, ProcessedOrder};
pub use services::{
    FulfillmentServices,
    ServiceError,
    SimulatedServices,
    DEFAULT_INVENTORY_FAILURE_RATE,
    DEFAULT_PAYMENT_FAILURE_RATE,
};
pub use validation::{validate_order, ValidatedOrder, PROCESS_ORDER_ACTION, TOTAL_TOLERANCE};
