pub mod db;
pub mod errors;
pub mod fetch;
pub mod helpers;
pub mod kv;
pub mod paginator;
pub mod query_params;
pub mod validation;
