use clap::Parser;

use crate::error::{AppError, AppResult};

use super::HarnessArgs;

pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<HarnessArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    HarnessArgs::try_parse_from(args).map_err(AppError::from)
}
