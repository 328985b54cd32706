//! Mock data and fixtures


pub use fixtures::TestDataFactory;
