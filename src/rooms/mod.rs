pub mod lifecycle;
pub mod room;
pub mod routes;
pub mod store;
