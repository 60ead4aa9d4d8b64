//! Integration tests

mod common;
mod dispatch_test;
mod e2e_test;
mod feed_test;
mod subscription_test;
