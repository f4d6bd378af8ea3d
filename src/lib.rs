pub mod api;
pub mod importer;
pub mod sports_api;
pub mod store;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}
