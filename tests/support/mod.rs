#![allow(dead_code)]

pub mod env;
pub mod files;
pub mod reader;
