use super::test_helpers::*;
use super::*;
use crate::error::TaskError;
use crate::types::TaskStatus;
