//! Reusable parameter formatters and validators for action inputs.

pub mod formatters;
pub mod validators;
