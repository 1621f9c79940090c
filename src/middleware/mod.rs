mod request_logger;

pub use request_logger::RequestTracker;
