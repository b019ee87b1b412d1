use std::path::PathBuf;

use pricetool_core::PipelineError;
use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Input path has no file name: {}", path.display()))]
    NoFileName { path: PathBuf },

    #[snafu(display("{source}"))]
    Convert {
        #[snafu(source(from(PipelineError, Box::new)))]
        source: Box<PipelineError>,
    },
}
