//! Payment handlers.

mod acknowledge_payment;

pub use acknowledge_payment::{
    AcknowledgePaymentCommand, AcknowledgePaymentError, AcknowledgePaymentHandler,
    AcknowledgePaymentResult,
};
