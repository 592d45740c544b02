use chrono::Local;
use log::{max_level, Level, LevelFilter, Metadata, Record, SetLoggerError};

pub struct StdLogger;

static LOGGER: StdLogger = StdLogger;

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

impl log::Log for StdLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let time_str = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
            match record.level() {
                Level::Error | Level::Warn => {
                    eprintln!("{0} {1:<5} [{2}] {3}", time_str, record.level(), record.target(), record.args())
                }
                _ => println!("{0} {1:<5} [{2}] {3}", time_str, record.level(), record.target(), record.args()),
            }
        }
    }

    fn flush(&self) {}
}
