//! Route handlers, one module per resource family

pub mod auth;
pub mod dashboard;
pub mod guests;
pub mod payments;
pub mod reservations;
pub mod rooms;

use crate::envelope::Reply;
use crate::error::ApiError;

pub type ApiResult<T> = Result<Reply<T>, ApiError>;
