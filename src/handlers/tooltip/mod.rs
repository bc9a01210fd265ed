mod graphql_client;
mod tooltip_handler;

pub use tooltip_handler::tooltip_handler;
