use thiserror::Error;

use crate::ast::TreeError;
use crate::config::ConfigError;
use crate::eval::BatchError;
use crate::parser::ParseException;

/// Any failure surfaced by this crate
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Parse(#[from] ParseException),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

pub type Result<T> = std::result::Result<T, Error>;
