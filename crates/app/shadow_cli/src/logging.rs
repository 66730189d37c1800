use flexi_logger::{DeferredNow, Logger, style};
use log::Record;

use crate::Error;

fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    write!(w, "{} {}", style(level).paint(level.to_string()), record.args())
}

pub fn init() -> Result<(), Error> {
    Logger::try_with_env_or_str("info")?
        .format(cli_format)
        .log_to_stderr()
        .start()?;

    Ok(())
}
