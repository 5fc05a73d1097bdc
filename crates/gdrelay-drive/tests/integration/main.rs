//! Integration tests for gdrelay-drive
//!
//! Uses wiremock to simulate the Drive v3 API and verifies change
//! enumeration, metadata, export/download and watch registration through
//! the `IDriveProvider` implementation.

mod common;

mod test_changes;
mod test_files;
mod test_watch;
