//! HTTP middleware

pub mod request_id;

pub use request_id::{SCRAPE_ID_HEADER, ScrapeId, scrape_id_middleware};
