mod executor;
mod listener;
mod schema;
