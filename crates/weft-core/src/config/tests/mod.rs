mod manager_tests;
mod schema_tests;
