mod consumer_tests;
mod fixtures;
mod state_store_tests;
