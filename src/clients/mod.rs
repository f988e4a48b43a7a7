pub mod admin_api;
