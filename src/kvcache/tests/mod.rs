//! Unit tests for chunk hashing and locality lookups.

mod mocks;
