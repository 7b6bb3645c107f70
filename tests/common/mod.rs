#![allow(dead_code)] // each test binary uses a subset of the builders

pub mod builders;
