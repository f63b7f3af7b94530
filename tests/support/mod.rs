#![allow(dead_code)]

pub mod fixtures;
pub mod surveycoder_env;
