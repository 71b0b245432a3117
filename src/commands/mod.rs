pub mod import;
pub mod publish;
pub mod query;
pub mod run;
pub mod status;
