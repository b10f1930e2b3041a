pub mod broker;
pub mod db;
