mod common;
mod engine_tests;
