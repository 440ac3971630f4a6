//! Integration tests driving the shipped variant profiles against mock
//! Unity Gradle exports.

mod bside_export;
mod white_package;
