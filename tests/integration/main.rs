// Integration tests
//
// Run against TEST_DATABASE_URL (defaults to a fresh SQLite file per test).

mod api_test;
mod credits_test;
mod race_condition_test;
