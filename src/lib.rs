pub mod access;
pub mod catalog;
pub mod executor;
pub mod expression;
pub mod invoke;
pub mod query;
