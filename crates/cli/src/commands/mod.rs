pub mod config_cmd;
pub mod run;
pub mod serve;
pub mod tools;
