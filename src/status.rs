use std::{fmt, os::raw::c_uint};

/// Status returned by FMI functions. The discriminants are the FMI 1.0 and 2.0 numeric codes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    /// All well
    #[default]
    Ok = 0,
    /// Things are not quite right, but the computation can continue.
    Warning = 1,
    /// For Model Exchange: a smaller step should be tried. For Co-Simulation: the slave could
    /// not complete the step, or could not deliver the requested status.
    Discard = 2,
    /// The FMU encountered an error. This instance cannot continue.
    Error = 3,
    /// The model computations are irreparably corrupted for all FMU instances.
    Fatal = 4,
    /// Returned by an asynchronous Co-Simulation slave. Not supported by this driver.
    Pending = 5,
}

impl Status {
    /// Convert a raw FMI status code. Unknown codes are treated as `Fatal`.
    pub fn from_raw(raw: c_uint) -> Self {
        match raw {
            0 => Status::Ok,
            1 => Status::Warning,
            2 => Status::Discard,
            3 => Status::Error,
            4 => Status::Fatal,
            5 => Status::Pending,
            _ => {
                log::error!("FMU returned an invalid status code {raw}");
                Status::Fatal
            }
        }
    }

    /// Rank used to decide which of two statuses is worse.
    pub const fn severity(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Discard => 2,
            Status::Pending => 3,
            Status::Error => 4,
            Status::Fatal => 5,
        }
    }

    /// The worse of `self` and `other`
    #[must_use]
    pub fn worst(self, other: Status) -> Status {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    /// `Error` or `Fatal`
    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, Status::Error | Status::Fatal)
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::Warning => "Warning",
            Status::Discard => "Discard",
            Status::Error => "Error",
            Status::Fatal => "Fatal",
            Status::Pending => "Pending",
        };
        f.write_str(s)
    }
}

impl From<Status> for log::Level {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok | Status::Pending => log::Level::Info,
            Status::Warning => log::Level::Warn,
            Status::Discard => log::Level::Trace,
            Status::Error | Status::Fatal => log::Level::Error,
        }
    }
}
