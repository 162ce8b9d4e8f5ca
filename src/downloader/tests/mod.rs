use super::test_helpers::*;
use super::*;
use crate::error::DownloadError;
use crate::types::TaskStatus;
use std::time::Duration;

mod queue;
mod worker;
